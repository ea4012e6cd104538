//! Fleet-wide figures derived from the latest snapshot list.

use std::collections::BTreeMap;

use gpuwatch_types::{DeviceSnapshot, ModelRecord, MB_PER_GB};
use serde::Serialize;

/// Bucket for models with a missing or empty task label.
pub const UNSPECIFIED_TASK: &str = "unspecified";

/// Arithmetic mean of utilization across devices.
///
/// Returns `None` ("no data") for an empty fleet instead of dividing by zero.
pub fn average_utilization(snapshots: &[DeviceSnapshot]) -> Option<f64> {
    if snapshots.is_empty() {
        return None;
    }
    let sum: f64 = snapshots.iter().map(|s| s.utilization_percent).sum();
    Some(sum / snapshots.len() as f64)
}

/// Total memory across devices in GB, rounded to one decimal.
pub fn total_memory_gb(snapshots: &[DeviceSnapshot]) -> f64 {
    round_tenth(snapshots.iter().map(|s| s.total_memory_mb).sum::<f64>() / MB_PER_GB)
}

/// Free memory across devices in GB, rounded to one decimal.
pub fn free_memory_gb(snapshots: &[DeviceSnapshot]) -> f64 {
    round_tenth(snapshots.iter().map(|s| s.free_memory_mb).sum::<f64>() / MB_PER_GB)
}

/// Used memory across devices in GB, rounded to one decimal.
pub fn used_memory_gb(snapshots: &[DeviceSnapshot]) -> f64 {
    round_tenth(snapshots.iter().map(|s| s.used_memory_mb).sum::<f64>() / MB_PER_GB)
}

/// Count models per task label.
///
/// Missing and empty (or whitespace-only) labels are tallied under
/// [`UNSPECIFIED_TASK`].
pub fn task_histogram(models: &[ModelRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for model in models {
        let task = model
            .task
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNSPECIFIED_TASK);
        *counts.entry(task.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Round to one decimal place for display.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summary of the whole fleet for the header bar and exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub device_count: usize,
    /// `None` when there are no devices.
    pub average_utilization: Option<f64>,
    pub total_memory_gb: f64,
    pub used_memory_gb: f64,
    pub free_memory_gb: f64,
    /// Highest temperature in the fleet.
    pub max_temperature_c: Option<f64>,
}

impl FleetSummary {
    /// Summarize a snapshot list.
    pub fn from_snapshots(snapshots: &[DeviceSnapshot]) -> Self {
        Self {
            device_count: snapshots.len(),
            average_utilization: average_utilization(snapshots),
            total_memory_gb: total_memory_gb(snapshots),
            used_memory_gb: used_memory_gb(snapshots),
            free_memory_gb: free_memory_gb(snapshots),
            max_temperature_c: snapshots.iter().map(|s| s.temperature_c).reduce(f64::max),
        }
    }

    /// Average utilization formatted for display, or "-" when there is no data.
    pub fn average_utilization_label(&self) -> String {
        self.average_utilization
            .map(|u| format!("{:.1}%", u))
            .unwrap_or_else(|| "-".to_string())
    }
}
