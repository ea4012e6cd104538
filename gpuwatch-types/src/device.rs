//! Device snapshot - a point-in-time reading of one accelerator.

/// Mebibytes per gibibyte, used for every MB → GB conversion.
pub const MB_PER_GB: f64 = 1024.0;

/// One poll's reading of a single accelerator.
///
/// The producer guarantees `used_memory_mb + free_memory_mb == total_memory_mb`.
/// Consumers render whatever arrives and do not re-validate it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceSnapshot {
    /// Stable device identifier, unique within a poll.
    pub index: u32,
    /// Marketing name reported by the driver.
    pub name: String,
    /// Compute utilization, 0-100.
    pub utilization_percent: f64,
    /// Core temperature in degrees Celsius.
    pub temperature_c: f64,
    pub used_memory_mb: f64,
    pub total_memory_mb: f64,
    pub free_memory_mb: f64,
}

impl DeviceSnapshot {
    /// Create a builder for a device snapshot.
    pub fn builder(index: u32, name: impl Into<String>) -> DeviceSnapshotBuilder {
        DeviceSnapshotBuilder::new(index, name)
    }

    /// Used memory as a percentage of total memory.
    ///
    /// Returns 0 when the device reports no total memory.
    pub fn memory_percent(&self) -> f64 {
        if self.total_memory_mb > 0.0 {
            self.used_memory_mb / self.total_memory_mb * 100.0
        } else {
            0.0
        }
    }

    pub fn total_memory_gb(&self) -> f64 {
        self.total_memory_mb / MB_PER_GB
    }

    pub fn used_memory_gb(&self) -> f64 {
        self.used_memory_mb / MB_PER_GB
    }

    pub fn free_memory_gb(&self) -> f64 {
        self.free_memory_mb / MB_PER_GB
    }
}

/// Builder for [`DeviceSnapshot`].
#[derive(Debug)]
pub struct DeviceSnapshotBuilder {
    snapshot: DeviceSnapshot,
}

impl DeviceSnapshotBuilder {
    /// Create a builder with zeroed readings.
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            snapshot: DeviceSnapshot {
                index,
                name: name.into(),
                utilization_percent: 0.0,
                temperature_c: 0.0,
                used_memory_mb: 0.0,
                total_memory_mb: 0.0,
                free_memory_mb: 0.0,
            },
        }
    }

    pub fn utilization(mut self, percent: f64) -> Self {
        self.snapshot.utilization_percent = percent;
        self
    }

    pub fn temperature(mut self, celsius: f64) -> Self {
        self.snapshot.temperature_c = celsius;
        self
    }

    /// Set used and total memory; free memory is derived from them.
    pub fn memory(mut self, used_mb: f64, total_mb: f64) -> Self {
        self.snapshot.used_memory_mb = used_mb;
        self.snapshot.total_memory_mb = total_mb;
        self.snapshot.free_memory_mb = total_mb - used_mb;
        self
    }

    /// Override free memory, e.g. to reproduce a producer that breaks the sum invariant.
    pub fn free_memory(mut self, free_mb: f64) -> Self {
        self.snapshot.free_memory_mb = free_mb;
        self
    }

    pub fn build(self) -> DeviceSnapshot {
        self.snapshot
    }
}
