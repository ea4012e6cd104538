//! Models view rendering.
//!
//! Bar chart of registered models per task label.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::poll::Lookup;

/// Render the Models view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let message = match app.session.models() {
        Lookup::NotRequested => Some("Press r to load models".to_string()),
        Lookup::Pending => Some("Loading models...".to_string()),
        Lookup::Failed(e) => Some(format!("Could not load models: {}", e)),
        Lookup::Ready(models) if models.is_empty() => Some("No models registered".to_string()),
        Lookup::Ready(_) => None,
    };

    if let Some(message) = message {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", message),
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block.title(" Models by task "));
        frame.render_widget(paragraph, area);
        return;
    }

    let Some(histogram) = app.session.task_histogram() else {
        return;
    };
    let total: usize = histogram.values().sum();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let bars: Vec<Bar> = histogram
        .iter()
        .map(|(task, count)| {
            Bar::default()
                .label(Line::from(task.clone()))
                .value(*count as u64)
                .style(Style::default().fg(app.theme.highlight))
        })
        .collect();

    let chart = BarChart::default()
        .block(block.clone().title(format!(" Models by task ({}) ", total)))
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(2)
        .value_style(app.theme.header);

    frame.render_widget(chart, chunks[0]);

    let header = Row::new(vec![Cell::from("Task"), Cell::from("Models")])
        .height(1)
        .style(app.theme.header);
    let rows: Vec<Row> = histogram
        .iter()
        .map(|(task, count)| Row::new(vec![Cell::from(task.clone()), Cell::from(count.to_string())]))
        .collect();

    let table = Table::new(rows, [Constraint::Fill(1), Constraint::Length(8)])
        .header(header)
        .block(block.title(" Counts "));

    frame.render_widget(table, chunks[1]);
}
