//! # gpuwatch-types
//!
//! Wire types shared between the device-status service and gpuwatch.
//!
//! These mirror the JSON payloads served by the device service:
//!
//! - [`DeviceSnapshot`]: one poll's reading of a single accelerator
//! - [`RecommendationResponse`] / [`Recommendation`]: the "optimal device" answer
//! - [`ModelRecord`]: a model registry entry (only its task label is used here)
//!
//! ## Features
//!
//! - `serde`: JSON serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use gpuwatch_types::DeviceSnapshot;
//!
//! let gpu = DeviceSnapshot::builder(0, "RTX 4090")
//!     .utilization(42.0)
//!     .temperature(61.0)
//!     .memory(8192.0, 24576.0)
//!     .build();
//!
//! assert_eq!(gpu.free_memory_mb, 16384.0);
//! ```

mod device;
mod model;
mod recommendation;

pub use device::*;
pub use model::*;
pub use recommendation::*;
