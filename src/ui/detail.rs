//! Detail overlay rendering.
//!
//! Displays a modal overlay for the selected device: memory breakdown and a
//! line chart of each metric's history.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::{Metric, MetricSeries};

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 20;

/// Render the device detail as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    // Skip rendering if terminal is too small for the overlay
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(gpu) = app.selected_device() else {
        return;
    };

    // Width: 95% of screen, clamped to [MIN_OVERLAY_WIDTH, 120]
    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 120);
    // Height: 90% of screen, clamped to [MIN_OVERLAY_HEIGHT, 50]
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 50);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(5), // Header with device info
        Constraint::Min(12),   // Charts
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    // ===== HEADER SECTION =====
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut readings = vec![Span::raw(" ")];
    for metric in Metric::ALL {
        let value = metric.sample(gpu);
        readings.push(Span::raw(format!("{}: ", metric.label())));
        readings.push(Span::styled(
            format!("{:.1} {}", value, metric.level(value).symbol()),
            app.theme.metric_style(metric, value).add_modifier(Modifier::BOLD),
        ));
        readings.push(Span::raw("    "));
    }

    let header_lines = vec![
        Line::from(vec![Span::styled(format!(" GPU {}: {} ", gpu.index, gpu.name), bold)]),
        Line::from(vec![
            Span::raw(" Total: "),
            Span::styled(format!("{:.2} GB", gpu.total_memory_gb()), bold),
            Span::raw("    Used: "),
            Span::styled(format!("{:.2} GB", gpu.used_memory_gb()), bold),
            Span::raw("    Free: "),
            Span::styled(format!("{:.2} GB", gpu.free_memory_gb()), bold),
        ]),
        Line::from(readings),
    ];

    let header_block = Block::default()
        .title(" Device Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    frame.render_widget(Paragraph::new(header_lines).block(header_block), chunks[0]);

    // ===== CHARTS =====
    let chart_chunks = Layout::vertical([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(chunks[1]);

    let history = app.session.history();
    for (metric, chunk) in Metric::ALL.into_iter().zip(chart_chunks.iter()) {
        render_chart(frame, app, history.series_for(gpu.index, metric), metric, *chunk);
    }

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " ↑/↓: other device   Esc: close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}

/// Chart points as (position, value), oldest first.
pub fn chart_points(series: &MetricSeries) -> Vec<(f64, f64)> {
    series
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect()
}

/// Chart title: metric label, latest value and change since the previous poll.
pub fn chart_title(series: &MetricSeries, metric: Metric) -> String {
    let Some(latest) = series.latest() else {
        return format!(" {} ", metric.label());
    };
    match series.delta() {
        Some(delta) => format!(
            " {}: {:.1} ({:+.1}{}) ",
            metric.label(),
            latest.value,
            delta,
            metric.unit()
        ),
        None => format!(" {}: {:.1} ", metric.label(), latest.value),
    }
}

fn render_chart(frame: &mut Frame, app: &App, series: &MetricSeries, metric: Metric, area: Rect) {
    let block = Block::default()
        .title(chart_title(series, metric))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if series.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "  No history yet",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let points = chart_points(series);
    let color = series
        .latest()
        .map(|p| app.theme.metric_color(metric, metric.level(p.value)))
        .unwrap_or(app.theme.highlight);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points);

    let first = series.oldest().map(|p| p.label.clone()).unwrap_or_default();
    let last = series.latest().map(|p| p.label.clone()).unwrap_or_default();
    let max_x = (series.capacity().saturating_sub(1)).max(1) as f64;
    let max_y = metric.axis_max();

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, max_x])
                .labels([first, last])
                .style(Style::default().fg(app.theme.border)),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, max_y])
                .labels([
                    "0".to_string(),
                    format!("{:.0}", max_y / 2.0),
                    format!("{:.0}", max_y),
                ])
                .style(Style::default().fg(app.theme.border)),
        );

    frame.render_widget(chart, area);
}
