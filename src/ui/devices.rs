//! Devices view rendering.
//!
//! Displays a table of every device with its current readings, colored by
//! band, and a sparkline of each metric's recent history.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use gpuwatch_types::{DeviceSnapshot, Recommendation};

use crate::app::App;
use crate::data::{HistoryStore, Metric};
use crate::poll::Lookup;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the Devices view showing all GPUs in a sortable table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let devices = app.sorted_devices();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if devices.is_empty() {
        let message = if app.session.last_updated().is_some() {
            "  No GPUs reported by the service"
        } else {
            "  Waiting for the first poll..."
        };
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(message, Style::default().add_modifier(Modifier::DIM))),
        ])
        .block(block.title(" GPUs (0) "));
        frame.render_widget(empty, area);
        return;
    }

    let recommended = match app.session.recommendation() {
        Lookup::Ready(Recommendation::Found { device_index, .. }) => Some(*device_index),
        _ => None,
    };

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Name"),
        Cell::from(header_label("Util", Metric::Utilization, app)),
        Cell::from("Trend"),
        Cell::from(header_label("Mem", Metric::Memory, app)),
        Cell::from("Trend"),
        Cell::from(header_label("Temp", Metric::Temperature, app)),
        Cell::from("Trend"),
        Cell::from("Memory (GB)"),
    ])
    .height(1)
    .style(app.theme.header);

    let history = app.session.history();
    let rows: Vec<Row> = devices
        .iter()
        .map(|gpu| {
            let marker = if recommended == Some(gpu.index) { "★" } else { "" };
            let mut cells = vec![
                Cell::from(format!("{}{}", gpu.index, marker)),
                Cell::from(gpu.name.clone()),
            ];
            for metric in Metric::ALL {
                let (value, trend) = metric_cells(app, history, gpu, metric);
                cells.push(value);
                cells.push(trend);
            }
            cells.push(Cell::from(format!(
                "{:.1}/{:.1}",
                gpu.used_memory_gb(),
                gpu.total_memory_gb()
            )));
            Row::new(cells)
        })
        .collect();

    let widths = [
        Constraint::Length(4),  // Index
        Constraint::Fill(3),    // Name
        Constraint::Length(7),  // Util
        Constraint::Min(8),     // Trend
        Constraint::Length(7),  // Mem
        Constraint::Min(8),     // Trend
        Constraint::Length(7),  // Temp
        Constraint::Min(8),     // Trend
        Constraint::Length(12), // Memory
    ];

    let selected = app.selected_device_index.min(devices.len().saturating_sub(1));
    let title = format!(
        " GPUs ({}) [s:sort {}↓] [{}/{}] ",
        devices.len(),
        app.sort_label(),
        selected + 1,
        devices.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

fn header_label(name: &str, metric: Metric, app: &App) -> String {
    if app.sort_metric == Some(metric) {
        format!("{}↓", name)
    } else {
        name.to_string()
    }
}

/// Current value (colored by band) and sparkline for one metric.
fn metric_cells(
    app: &App,
    history: &HistoryStore,
    gpu: &DeviceSnapshot,
    metric: Metric,
) -> (Cell<'static>, Cell<'static>) {
    let value = metric.sample(gpu);
    let style = app.theme.metric_style(metric, value);
    let series = history.series_for(gpu.index, metric);
    let color = app.theme.metric_color(metric, metric.level(value));

    (
        Cell::from(format!("{:.0}{}", value, metric.unit())).style(style),
        Cell::from(render_sparkline(&series.sparkline(metric.axis_max())))
            .style(Style::default().fg(color)),
    )
}

/// Render sparkline levels (0-7) as block characters, newest last.
pub fn render_sparkline(levels: &[u8]) -> String {
    if levels.is_empty() {
        return "-".to_string();
    }
    levels[levels.len().saturating_sub(8)..]
        .iter()
        .map(|&v| SPARKLINE_CHARS[(v as usize).min(7)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sparkline_keeps_newest_eight() {
        assert_eq!(render_sparkline(&[]), "-");
        assert_eq!(render_sparkline(&[0, 7]), "▁█");
        let levels: Vec<u8> = (0..10).map(|i| (i % 8) as u8).collect();
        assert_eq!(render_sparkline(&levels), "▃▄▅▆▇█▁▂");
    }
}
