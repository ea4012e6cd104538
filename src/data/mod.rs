//! Data models and processing for device snapshots.
//!
//! ## Submodules
//!
//! - [`metric`]: The tracked metric kinds ([`Metric`]) and their display bands
//! - [`history`]: Bounded per-device, per-metric history ([`HistoryStore`])
//! - [`aggregate`]: Fleet-wide figures ([`FleetSummary`]) and the task histogram
//!
//! ## Data Flow
//!
//! ```text
//! Vec<DeviceSnapshot> (one successful poll)
//!        │
//!        ├──▶ HistoryStore::observe() (one point per metric per device)
//!        │
//!        └──▶ FleetSummary::from_snapshots() (header figures)
//! ```

pub mod aggregate;
pub mod history;
pub mod metric;

pub use aggregate::{
    average_utilization, free_memory_gb, task_histogram, total_memory_gb, FleetSummary,
    UNSPECIFIED_TASK,
};
pub use history::{
    DeviceHistory, HistoryStore, MetricPoint, MetricSeries, RetentionPolicy, DEFAULT_CAPACITY,
};
pub use metric::{Level, Metric};
