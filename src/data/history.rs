//! Rolling per-device metric history for sparklines and charts.

use std::collections::{BTreeMap, HashSet, VecDeque};

use gpuwatch_types::DeviceSnapshot;
use serde::Serialize;

use super::metric::Metric;

/// Default number of points kept per series.
pub const DEFAULT_CAPACITY: usize = 20;

/// A single labelled sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Wall-clock label of the poll that produced this sample.
    pub label: String,
    pub value: f64,
}

/// A fixed-capacity FIFO of samples for one (device, metric) pair.
///
/// Appends go to the tail; once full, every append evicts the oldest point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    capacity: usize,
    points: VecDeque<MetricPoint>,
}

impl MetricSeries {
    /// Create an empty series. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a point, returning the evicted oldest point if the series was full.
    pub fn push(&mut self, point: MetricPoint) -> Option<MetricPoint> {
        self.points.push_back(point);
        if self.points.len() > self.capacity {
            self.points.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate points from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MetricPoint> {
        self.points.iter()
    }

    /// Values from oldest to newest.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Labels from oldest to newest.
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn latest(&self) -> Option<&MetricPoint> {
        self.points.back()
    }

    pub fn oldest(&self) -> Option<&MetricPoint> {
        self.points.front()
    }

    /// Change between the two most recent samples.
    ///
    /// Returns None if there's not enough history.
    pub fn delta(&self) -> Option<f64> {
        if self.points.len() < 2 {
            return None;
        }
        let current = self.points.back()?.value;
        let previous = self.points.get(self.points.len() - 2)?.value;
        Some(current - previous)
    }

    /// Values normalized to 0-7 (8 bar levels) against `[0, max]`.
    ///
    /// Values outside the range are clamped.
    pub fn sparkline(&self, max: f64) -> Vec<u8> {
        let max = if max > 0.0 { max } else { 1.0 };
        self.points
            .iter()
            .map(|p| {
                let normalized = (p.value.max(0.0) / max * 7.0).round();
                (normalized as u8).min(7)
            })
            .collect()
    }
}

/// What to do with devices that stop appearing in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep every device's history for the lifetime of the store.
    #[default]
    RetainAll,
    /// Drop a device after this many consecutive polls without it.
    EvictAfterMissed(u32),
}

/// All tracked series for one device.
#[derive(Debug, Clone)]
pub struct DeviceHistory {
    /// Name from the most recent snapshot that included this device.
    pub name: String,
    series: BTreeMap<Metric, MetricSeries>,
    /// Consecutive polls this device has been absent from.
    pub missed_polls: u32,
}

impl DeviceHistory {
    fn new(name: &str, capacity: usize) -> Self {
        let series = Metric::ALL
            .iter()
            .map(|&metric| (metric, MetricSeries::with_capacity(capacity)))
            .collect();
        Self {
            name: name.to_string(),
            series,
            missed_polls: 0,
        }
    }

    pub fn series(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }

    fn record(&mut self, snapshot: &DeviceSnapshot, label: &str, capacity: usize) {
        self.name.clone_from(&snapshot.name);
        self.missed_polls = 0;
        for metric in Metric::ALL {
            let series = self
                .series
                .entry(metric)
                .or_insert_with(|| MetricSeries::with_capacity(capacity));
            series.push(MetricPoint {
                label: label.to_string(),
                value: metric.sample(snapshot),
            });
        }
    }
}

/// Rolling history: device index → metric → bounded series.
///
/// Devices are added lazily the first time they are observed. Mutation
/// happens only through [`HistoryStore::observe`], which takes `&mut self`,
/// so readers can never see a half-applied append.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    retention: RetentionPolicy,
    devices: BTreeMap<u32, DeviceHistory>,
    /// Returned by `series_for` for anything never observed.
    empty: MetricSeries,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Create an empty store with [`DEFAULT_CAPACITY`] points per series.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty store with a custom per-series capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let empty = MetricSeries::with_capacity(capacity);
        Self {
            capacity: empty.capacity(),
            retention: RetentionPolicy::default(),
            devices: BTreeMap::new(),
            empty,
        }
    }

    /// Set the policy for devices missing from later snapshots.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Record one poll's snapshots under a timestamp label.
    ///
    /// Appends one point per tracked metric for every device in `snapshots`.
    /// Devices absent from `snapshots` are left untouched unless the
    /// retention policy evicts them.
    pub fn observe(&mut self, snapshots: &[DeviceSnapshot], label: &str) {
        let capacity = self.capacity;
        let mut seen = HashSet::with_capacity(snapshots.len());

        for snapshot in snapshots {
            seen.insert(snapshot.index);
            self.devices
                .entry(snapshot.index)
                .or_insert_with(|| DeviceHistory::new(&snapshot.name, capacity))
                .record(snapshot, label, capacity);
        }

        for (index, device) in self.devices.iter_mut() {
            if !seen.contains(index) {
                device.missed_polls = device.missed_polls.saturating_add(1);
            }
        }

        if let RetentionPolicy::EvictAfterMissed(limit) = self.retention {
            self.devices.retain(|index, device| {
                let keep = seen.contains(index) || device.missed_polls < limit;
                if !keep {
                    tracing::debug!(device = index, "evicting history of absent device");
                }
                keep
            });
        }
    }

    /// Series for a device and metric; empty if never observed.
    pub fn series_for(&self, device_index: u32, metric: Metric) -> &MetricSeries {
        self.devices
            .get(&device_index)
            .and_then(|d| d.series(metric))
            .unwrap_or(&self.empty)
    }

    pub fn device(&self, device_index: u32) -> Option<&DeviceHistory> {
        self.devices.get(&device_index)
    }

    /// Indices of every device with history, ascending.
    pub fn device_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.devices.keys().copied()
    }

    /// Number of devices with history.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
