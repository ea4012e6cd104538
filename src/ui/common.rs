//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use gpuwatch_types::Recommendation;

use crate::app::{App, View};
use crate::data::Metric;
use crate::poll::{Lookup, SchedulerState};

/// Render the header bar with the fleet summary.
///
/// Displays: hottest band indicator, device count, average utilization,
/// memory totals.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let summary = app.session.summary();

    if summary.device_count == 0 {
        let status = if app.session.last_error().is_some() {
            "No data"
        } else if app.session.last_updated().is_some() {
            "No GPUs found"
        } else {
            "Loading..."
        };
        let line = Line::from(vec![
            Span::styled(" GPUWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("| {}", status)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let util_style = summary
        .average_utilization
        .map(|u| app.theme.metric_style(Metric::Utilization, u))
        .unwrap_or_default();
    let temp_style = summary
        .max_temperature_c
        .map(|t| app.theme.metric_style(Metric::Temperature, t))
        .unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(" ● ", util_style),
        Span::styled("GPUWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            format!("{}", summary.device_count),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" GPUs │ avg util "),
        Span::styled(summary.average_utilization_label(), util_style),
        Span::raw(" │ memory "),
        Span::raw(format!(
            "{:.1}/{:.1} GB ({:.1} GB free)",
            summary.used_memory_gb, summary.total_memory_gb, summary.free_memory_gb
        )),
        Span::raw(" │ max temp "),
        Span::styled(
            summary
                .max_temperature_c
                .map(|t| format!("{:.0}°C", t))
                .unwrap_or_else(|| "-".to_string()),
            temp_style,
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" Devices "), Line::from(" Models ")];

    let selected = match app.current_view {
        View::Devices => 0,
        View::Models => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Text for the status bar, without styling.
///
/// Shows: poll state and interval, last update, held error, recommendation,
/// available controls. A temporary status message replaces all of it.
pub fn status_text(app: &App) -> String {
    if let Some(msg) = app.get_status_message() {
        return format!(" {} ", msg);
    }

    let session = &app.session;

    let polling = match (session.state(), session.interval()) {
        (SchedulerState::Running, Some(interval)) => format!("every {}s", interval.as_secs_f64()),
        (SchedulerState::Stopped, _) => match session.stop_reason() {
            Some(reason) => format!("stopped ({})", reason),
            None => "stopped".to_string(),
        },
        (state, _) => state.label().to_string(),
    };

    let updated = session
        .last_updated()
        .map(|label| format!("Updated {}", label))
        .unwrap_or_else(|| "Waiting for data".to_string());

    let mut parts = vec![format!(" {}", session.source_description()), polling, updated];

    if let Some(err) = session.last_error() {
        parts.push(format!("Error: {}", err));
    }

    match session.recommendation() {
        Lookup::Pending => parts.push("Optimal: ...".to_string()),
        Lookup::Ready(Recommendation::Found { device_index, .. }) => {
            parts.push(format!("Optimal: GPU {}", device_index))
        }
        Lookup::Ready(Recommendation::NotFound { message }) => {
            parts.push(format!("Optimal: {}", message))
        }
        Lookup::Failed(e) => parts.push(format!("Optimal: {}", e)),
        Lookup::NotRequested => {}
    }

    let controls = match app.current_view {
        View::Devices => "s:sort Enter:detail o:optimal r:refresh ?:help q:quit",
        View::Models => "r:reload Tab:switch ?:help q:quit",
    };
    parts.push(controls.to_string());

    parts.join(" | ")
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let text = status_text(app);

    let style = if app.get_status_message().is_some() {
        Style::default().fg(app.theme.highlight)
    } else if app.session.last_error().is_some() {
        Style::default().fg(app.theme.high)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    frame.render_widget(Paragraph::new(text).style(style), area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate devices"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Device charts"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Polling"),
        Line::from("  r         Refresh now"),
        Line::from("  2 / 5 / 0 Every 2s / 5s / 10s"),
        Line::from("  p         Pause / resume"),
        Line::from(""),
        section(" General"),
        Line::from("  s         Cycle sort metric"),
        Line::from("  o         Ask for the optimal GPU"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 25u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
