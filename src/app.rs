//! Application state and navigation logic.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use gpuwatch_types::DeviceSnapshot;

use crate::data::Metric;
use crate::export;
use crate::poll::{Lookup, MonitorSession, PollConfig, SchedulerState};
use crate::ui::Theme;

/// Interval presets offered by the number keys.
pub const INTERVAL_PRESETS: [(char, Duration); 3] = [
    ('2', Duration::from_secs(2)),
    ('5', Duration::from_secs(5)),
    ('0', Duration::from_secs(10)),
];

/// Interval bound to a preset key, if any.
pub fn preset_interval(key: char) -> Option<Duration> {
    INTERVAL_PRESETS
        .iter()
        .find(|(preset, _)| *preset == key)
        .map(|(_, interval)| *interval)
}

/// The current view/tab in the TUI.
///
/// Device detail is shown as an overlay (controlled by `App::show_detail_overlay`)
/// rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live table of every device with sparklines.
    Devices,
    /// Models in the registry, tallied by task.
    Models,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Devices => View::Models,
            View::Models => View::Devices,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        self.next()
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Devices => "Devices",
            View::Models => "Models",
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    /// The one monitoring session; every view reads from it.
    pub session: MonitorSession,
    /// Interval to resume with after a pause.
    pub interval: Duration,

    // Navigation state
    pub selected_device_index: usize,

    /// Sort devices by this metric (descending); `None` sorts by index.
    pub sort_metric: Option<Metric>,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App around a session that has not been started yet.
    pub fn new(session: MonitorSession, config: PollConfig) -> Self {
        Self::with_theme(session, config, Theme::auto_detect())
    }

    /// Create an App with an explicit theme (no terminal probing).
    pub fn with_theme(session: MonitorSession, config: PollConfig, theme: Theme) -> Self {
        Self {
            running: true,
            current_view: View::Devices,
            show_help: false,
            show_detail_overlay: false,
            session,
            interval: config.interval(),
            selected_device_index: 0,
            sort_metric: None,
            theme,
            status_message: None,
        }
    }

    /// Start polling at the configured interval.
    pub fn start(&mut self) -> Result<()> {
        self.session.start(PollConfig::new(self.interval)?)?;
        Ok(())
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.session.source_description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Apply whatever the background tasks have reported.
    ///
    /// Returns true if new data arrived.
    pub fn update(&mut self) -> bool {
        let changed = self.session.pump();
        if changed {
            let count = self.session.snapshots().len();
            if self.selected_device_index >= count {
                self.selected_device_index = count.saturating_sub(1);
            }
        }
        changed
    }

    /// Devices in display order.
    pub fn sorted_devices(&self) -> Vec<&DeviceSnapshot> {
        let mut devices: Vec<&DeviceSnapshot> = self.session.snapshots().iter().collect();
        match self.sort_metric {
            Some(metric) => devices.sort_by(|a, b| {
                metric
                    .sample(b)
                    .total_cmp(&metric.sample(a))
                    .then(a.index.cmp(&b.index))
            }),
            None => devices.sort_by_key(|d| d.index),
        }
        devices
    }

    /// The device under the cursor.
    pub fn selected_device(&self) -> Option<&DeviceSnapshot> {
        self.sorted_devices()
            .get(self.selected_device_index)
            .copied()
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.set_view(self.current_view.next());
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.set_view(self.current_view.prev());
    }

    /// Switch to a specific view. The model list is loaded on first visit.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
        self.show_detail_overlay = false;
        if view == View::Models && matches!(self.session.models(), Lookup::NotRequested) {
            self.session.request_models();
        }
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.session.snapshots().len().saturating_sub(1);
        self.selected_device_index = (self.selected_device_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_device_index = self.selected_device_index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        self.selected_device_index = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        self.selected_device_index = self.session.snapshots().len().saturating_sub(1);
    }

    /// Open the detail overlay for the currently selected device.
    pub fn enter_detail(&mut self) {
        if self.current_view == View::Devices && self.selected_device().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlay first, then return to Devices.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else if self.current_view != View::Devices {
            self.current_view = View::Devices;
        }
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Cycle the sort: index → utilization → memory → temperature → index.
    pub fn cycle_sort(&mut self) {
        self.sort_metric = match self.sort_metric {
            None => Some(Metric::Utilization),
            Some(Metric::Temperature) => None,
            Some(metric) => Some(metric.next()),
        };
        self.selected_device_index = 0;
    }

    /// Label of the current sort for the status bar.
    pub fn sort_label(&self) -> &'static str {
        self.sort_metric.map(Metric::name).unwrap_or("index")
    }

    /// Poll at a new interval; resumes polling if paused.
    pub fn set_interval(&mut self, interval: Duration) {
        let config = match PollConfig::new(interval) {
            Ok(config) => config,
            Err(e) => {
                self.set_status_message(format!("Invalid interval: {}", e));
                return;
            }
        };
        self.interval = interval;

        let result = if self.session.state() == SchedulerState::Running {
            self.session.reconfigure(config)
        } else {
            self.session.start(config)
        };
        match result {
            Ok(()) => self.set_status_message(format!("Refreshing every {}s", interval.as_secs())),
            Err(e) => self.set_status_message(format!("Could not change interval: {}", e)),
        }
    }

    /// Pause or resume polling.
    pub fn toggle_polling(&mut self) {
        if self.session.state() == SchedulerState::Running {
            self.session.stop();
            self.set_status_message("Polling paused".to_string());
        } else {
            let interval = self.interval;
            self.set_interval(interval);
        }
    }

    /// Fetch now without waiting for the timer.
    pub fn refresh(&mut self) {
        if !self.session.refresh_now() {
            let msg = match self.session.state() {
                SchedulerState::Running => "Refresh already in progress",
                _ => "Polling is paused (p to resume)",
            };
            self.set_status_message(msg.to_string());
        }
    }

    /// Ask the service which device to use.
    pub fn recommend(&mut self) {
        self.session.request_recommendation();
        self.set_status_message("Asking for the optimal GPU...".to_string());
    }

    /// Reload the model list.
    pub fn reload_models(&mut self) {
        self.session.request_models();
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export current state, including history, to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        if self.session.history().is_empty() {
            anyhow::bail!("No data to export");
        }

        let mut document = export::report(
            self.session.snapshots(),
            self.session.summary(),
            Some(self.session.history()),
        );
        if let (Some(map), Lookup::Ready(rec)) =
            (document.as_object_mut(), self.session.recommendation())
        {
            map.insert("recommendation".to_string(), export::recommendation_json(rec));
        }
        if let (Some(map), Some(histogram)) =
            (document.as_object_mut(), self.session.task_histogram())
        {
            map.insert("task_histogram".to_string(), serde_json::json!(histogram));
        }

        export::write_json(path, &document)
    }
}
