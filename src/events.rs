use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{preset_interval, App, View};

/// File written by the `e` key.
pub const EXPORT_FILE: &str = "gpuwatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // If detail overlay is shown, handle overlay-specific keys
    if app.show_detail_overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                app.close_overlay();
            }
            // Allow scrolling through devices while overlay is open
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::Home => app.select_first(),
            KeyCode::End => app.select_last(),
            _ => {}
        }
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),

        // Navigation (up/down for items, left/right for tabs)
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Enter detail overlay
        KeyCode::Enter => app.enter_detail(),

        // Go back (Esc and Backspace)
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        // Polling
        KeyCode::Char('r') => {
            if app.current_view == View::Models {
                app.reload_models();
            } else {
                app.refresh();
            }
        }
        KeyCode::Char('p') => app.toggle_polling(),

        // Optimal device
        KeyCode::Char('o') => app.recommend(),

        // Sorting
        KeyCode::Char('s') => {
            if app.current_view == View::Devices {
                app.cycle_sort();
            }
        }

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        // Export
        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        // Interval presets
        KeyCode::Char(c) => {
            if let Some(interval) = preset_interval(c) {
                app.set_interval(interval);
            }
        }

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    match mouse.kind {
        // Scroll wheel
        MouseEventKind::ScrollUp => {
            app.select_prev();
        }
        MouseEventKind::ScrollDown => {
            app.select_next();
        }

        // Click to select
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked_row = mouse.row;

            // Device rows start after header, tabs, border and table header
            if app.current_view == View::Devices && clicked_row > content_start_row {
                let item_row = (clicked_row - content_start_row - 1) as usize;
                if item_row < app.session.snapshots().len() {
                    app.selected_device_index = item_row;
                }
            }

            // Tab clicks (row 1, after header): Devices (0-11), Models (12-22)
            if clicked_row == 1 {
                let col = mouse.column;
                if col < 12 {
                    app.set_view(View::Devices);
                } else if col < 23 {
                    app.set_view(View::Models);
                }
            }
        }

        // Right-click goes back
        MouseEventKind::Down(MouseButton::Right) => {
            app.go_back();
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::poll::{MonitorSession, PollConfig, SchedulerState};
    use crate::source::SimulatedFleet;
    use crate::ui::Theme;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn started_app() -> App {
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

    #[tokio::test(start_paused = true)]
    async fn test_interval_preset_keys() {
        let mut app = started_app().await;

        handle_key_event(&mut app, key(KeyCode::Char('2')));
        assert_eq!(app.session.interval(), Some(Duration::from_secs(2)));

        handle_key_event(&mut app, key(KeyCode::Char('0')));
        assert_eq!(app.session.interval(), Some(Duration::from_secs(10)));
        assert_eq!(app.session.armed_timers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_quit() {
        let mut app = started_app().await;

        handle_key_event(&mut app, key(KeyCode::Char('p')));
        assert_eq!(app.session.state(), SchedulerState::Stopped);

        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_overlay_keys() {
        let mut app = started_app().await;

        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(app.show_detail_overlay);

        handle_key_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.selected_device_index, 1);

        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(!app.show_detail_overlay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_swallows_next_key() {
        let mut app = started_app().await;

        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.show_help);
        assert!(app.running);
    }
}
