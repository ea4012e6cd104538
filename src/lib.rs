// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # gpuwatch
//!
//! A terminal client and library for watching a fleet of GPUs through a
//! device service.
//!
//! The client polls the service for device snapshots on a configurable
//! interval, keeps a bounded rolling history per device and metric, derives
//! fleet-wide figures, and can ask the service which device to use next.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   poll   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │ (session)│    │(render) │    │         │ │
//! │  └─────────┘    └────┬─────┘    └─────────┘    └─────────┘ │
//! │                      │   ▲                                  │
//! │              spawn   ▼   │ SessionEvent (mpsc)              │
//! │                 ┌──────────┐        ┌──────────┐            │
//! │                 │  source  │        │   data   │            │
//! │                 │ (fetch)  │        │(history) │            │
//! │                 └──────────┘        └──────────┘            │
//! │                      ▲                                      │
//! │        ServiceClient | SimulatedFleet                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Device service abstraction ([`SnapshotFetcher`],
//!   [`RecommendationSource`], [`ModelSource`]) with an HTTP client and a
//!   simulated fleet
//! - **[`poll`]**: The poll scheduler state machine and the [`MonitorSession`]
//!   that drives it on a tokio runtime
//! - **[`data`]**: Rolling per-device history ([`HistoryStore`]) and fleet
//!   aggregates ([`FleetSummary`])
//! - **[`app`]** / **[`ui`]**: Application state and ratatui rendering
//! - **[`config`]** / **[`export`]**: Layered settings and JSON export
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch the service on localhost:8000, polling every 5s
//! gpuwatch --api-url http://localhost:8000 --token $TOKEN
//!
//! # Try the UI without a service
//! gpuwatch --demo 4
//!
//! # Fetch once and write a JSON report
//! gpuwatch --export fleet.json
//! ```
//!
//! ### Fetching snapshots
//!
//! ```no_run
//! use gpuwatch::{ServiceClient, SnapshotFetcher};
//!
//! # tokio_test::block_on(async {
//! let client = ServiceClient::builder()
//!     .base_url("http://localhost:8000")
//!     .token("secret")
//!     .build()
//!     .unwrap();
//!
//! for gpu in client.fetch().await.unwrap() {
//!     println!("{}: {:.0}%", gpu.name, gpu.utilization_percent);
//! }
//! # });
//! ```
//!
//! ### Recording history
//!
//! ```
//! use gpuwatch::{HistoryStore, Metric, SimulatedFleet, SnapshotFetcher};
//!
//! # tokio_test::block_on(async {
//! let fleet = SimulatedFleet::new(2);
//! let mut history = HistoryStore::with_capacity(20);
//!
//! history.observe(&fleet.fetch().await.unwrap(), "12:00:00");
//! history.observe(&fleet.fetch().await.unwrap(), "12:00:05");
//!
//! assert_eq!(history.series_for(0, Metric::Utilization).len(), 2);
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod export;
pub mod poll;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use data::{FleetSummary, HistoryStore, Metric, MetricSeries, RetentionPolicy};
pub use gpuwatch_types::{DeviceSnapshot, ModelRecord, Recommendation};
pub use poll::{MonitorSession, PollConfig, PollScheduler, SchedulerState};
pub use source::{
    DeviceService, FetchError, ModelSource, RecommendationSource, ServiceClient, SimulatedFleet,
    SnapshotFetcher,
};
