//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::{Level, Metric};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for readings in the low band.
    pub low: Color,
    /// Color for readings in the moderate band.
    pub moderate: Color,
    /// Color for readings in the high band.
    pub high: Color,
    /// Temperature colors, low to high band.
    pub cool: Color,
    pub warm: Color,
    pub hot: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            low: Color::Green,
            moderate: Color::Yellow,
            high: Color::Red,
            cool: Color::LightBlue,
            warm: Color::LightYellow,
            hot: Color::LightMagenta,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            low: Color::Green,
            moderate: Color::Yellow,
            high: Color::Red,
            cool: Color::Blue,
            warm: Color::Rgb(175, 95, 0),
            hot: Color::Magenta,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn level_color(&self, level: Level) -> Color {
        match level {
            Level::Low => self.low,
            Level::Moderate => self.moderate,
            Level::High => self.high,
        }
    }

    /// Color for a reading of `metric` in `level`.
    pub fn metric_color(&self, metric: Metric, level: Level) -> Color {
        match (metric, level) {
            (Metric::Temperature, Level::Low) => self.cool,
            (Metric::Temperature, Level::Moderate) => self.warm,
            (Metric::Temperature, Level::High) => self.hot,
            (_, level) => self.level_color(level),
        }
    }

    /// Style for a reading of `metric`, banded by its value.
    pub fn metric_style(&self, metric: Metric, value: f64) -> Style {
        let level = metric.level(value);
        self.emphasize(level, self.metric_color(metric, level))
    }

    fn emphasize(&self, level: Level, color: Color) -> Style {
        match level {
            Level::High => Style::default().fg(color).add_modifier(Modifier::BOLD),
            _ => Style::default().fg(color),
        }
    }
}
