//! Terminal UI rendering using ratatui.
//!
//! This module contains all the view-specific rendering logic for the TUI.
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`devices`]: Live table of every GPU with readings and sparklines
//! - [`models`]: Registered models tallied by task
//! - [`detail`]: Modal overlay with memory breakdown and history charts
//! - [`common`]: Shared components (header, tabs, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! [`draw`] lays out one frame and calls into these modules based on the
//! current view:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (devices/models::render)             │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//! ```

pub mod common;
pub mod detail;
pub mod devices;
pub mod models;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, View};

/// Minimum terminal width for a usable display.
pub const MIN_WIDTH: u16 = 60;
/// Minimum terminal height for a usable display.
pub const MIN_HEIGHT: u16 = 12;

/// Row where table content starts: header (1) + tabs (1) + table header (1).
pub const CONTENT_START_ROW: u16 = 3;

/// Draw one frame of the whole UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));
        let centered = Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5)
            .intersection(area);
        frame.render_widget(paragraph, centered);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Length(1), // Tabs
        Constraint::Min(8),    // Content
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    common::render_tabs(frame, app, chunks[1]);

    match app.current_view {
        View::Devices => devices::render(frame, app, chunks[2]),
        View::Models => models::render(frame, app, chunks[2]),
    }

    common::render_status_bar(frame, app, chunks[3]);

    if app.show_detail_overlay {
        detail::render_overlay(frame, app, area);
    }

    if app.show_help {
        common::render_help(frame, app, area);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::poll::{MonitorSession, PollConfig};
    use crate::source::SimulatedFleet;

    async fn running_app() -> App {
        let session = MonitorSession::builder(Arc::new(SimulatedFleet::new(2)))
            .build()
            .unwrap();
        let mut app = App::with_theme(session, PollConfig::default(), Theme::dark());
        app.start().unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
            app.update();
        }
        app
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_devices_view() {
        let app = running_app().await;
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| draw(frame, &app)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("GPUWATCH"));
        assert!(text.contains("Simulated GPU 0"));
        assert!(text.contains("Simulated GPU 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_overlays_and_models() {
        let mut app = running_app().await;
        app.enter_detail();
        app.toggle_help();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| draw(frame, &app)).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("Keyboard Shortcuts"));

        app.toggle_help();
        app.close_overlay();
        app.set_view(View::Models);
        for _ in 0..10 {
            tokio::task::yield_now().await;
            app.update();
        }
        terminal.draw(|frame| draw(frame, &app)).unwrap();
        assert!(screen(&terminal).contains("Models by task"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_too_small() {
        let app = running_app().await;
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal.draw(|frame| draw(frame, &app)).unwrap();
        assert!(screen(&terminal).contains("Terminal too small"));
    }
}
