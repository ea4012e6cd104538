//! Device service abstraction.
//!
//! This module provides trait-based access to the device-status service so
//! the poll loop can run against the real HTTP backend, a simulated fleet,
//! or an in-process mock in tests.
//!
//! ```text
//! ┌──────────────────┐   fetch()      ┌───────────────────┐
//! │  MonitorSession  │───────────────▶│  SnapshotFetcher  │──▶ GET /gpus
//! │                  │   recommend()  ├───────────────────┤
//! │                  │───────────────▶│RecommendationSrc  │──▶ GET /gpus/optimal
//! │                  │   models()     ├───────────────────┤
//! │                  │───────────────▶│   ModelSource     │──▶ GET /models
//! └──────────────────┘                └───────────────────┘
//! ```

mod credentials;
mod error;
mod http;
mod simulated;

pub use credentials::{CredentialStore, TokenStore};
pub use error::FetchError;
pub use http::{ServiceClient, ServiceClientBuilder, DEFAULT_BASE_URL};
pub use simulated::SimulatedFleet;

use std::fmt::Debug;

use async_trait::async_trait;
use gpuwatch_types::{DeviceSnapshot, ModelRecord, Recommendation};

/// One round-trip to the device-status service.
///
/// Implementations hold no state between calls and never retry; the poll
/// loop decides when to ask again.
///
/// # Example
///
/// ```
/// use gpuwatch::{SimulatedFleet, SnapshotFetcher};
///
/// # tokio_test::block_on(async {
/// let fleet = SimulatedFleet::new(2);
/// let gpus = fleet.fetch().await.unwrap();
/// assert_eq!(gpus.len(), 2);
/// # });
/// ```
#[async_trait]
pub trait SnapshotFetcher: Send + Sync + Debug {
    /// Fetch the current snapshot of every device.
    async fn fetch(&self) -> Result<Vec<DeviceSnapshot>, FetchError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}

/// The service's "optimal device" query.
///
/// The selection heuristic belongs to the service; this is a call-through.
#[async_trait]
pub trait RecommendationSource: Send + Sync + Debug {
    async fn recommend(&self) -> Result<Recommendation, FetchError>;
}

/// The service's model registry, used for the task histogram.
#[async_trait]
pub trait ModelSource: Send + Sync + Debug {
    async fn models(&self) -> Result<Vec<ModelRecord>, FetchError>;
}

/// Everything a monitoring session needs from the service.
pub trait DeviceService: SnapshotFetcher + RecommendationSource + ModelSource {}

impl<T: SnapshotFetcher + RecommendationSource + ModelSource> DeviceService for T {}
