//! Tracked metric kinds and their display bands.

use gpuwatch_types::DeviceSnapshot;
use serde::Serialize;

/// A metric tracked per device in the history store.
///
/// Each variant knows how to read its value from a snapshot, so call sites
/// never branch on metric names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Compute utilization, read directly from the snapshot.
    Utilization,
    /// Used memory as a percentage of total, derived from two fields.
    Memory,
    /// Core temperature in °C, read directly.
    Temperature,
}

impl Metric {
    /// Every tracked metric, in display order.
    pub const ALL: [Metric; 3] = [Metric::Utilization, Metric::Memory, Metric::Temperature];

    /// Extract this metric's value from a snapshot.
    pub fn sample(self, snapshot: &DeviceSnapshot) -> f64 {
        match self {
            Metric::Utilization => snapshot.utilization_percent,
            Metric::Memory => snapshot.memory_percent(),
            Metric::Temperature => snapshot.temperature_c,
        }
    }

    /// Short lowercase name, as used in exports.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Utilization => "utilization",
            Metric::Memory => "memory",
            Metric::Temperature => "temperature",
        }
    }

    /// Human-readable label for chart titles.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Utilization => "Utilization %",
            Metric::Memory => "Memory %",
            Metric::Temperature => "Temperature °C",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Utilization | Metric::Memory => "%",
            Metric::Temperature => "°C",
        }
    }

    /// Upper bound of the chart's y axis.
    pub fn axis_max(self) -> f64 {
        100.0
    }

    /// Classify a value of this metric into a display band.
    pub fn level(self, value: f64) -> Level {
        let (moderate, high) = match self {
            Metric::Utilization | Metric::Memory => (30.0, 70.0),
            Metric::Temperature => (50.0, 80.0),
        };
        if value < moderate {
            Level::Low
        } else if value < high {
            Level::Moderate
        } else {
            Level::High
        }
    }

    /// Cycle to the next metric.
    pub fn next(self) -> Self {
        match self {
            Metric::Utilization => Metric::Memory,
            Metric::Memory => Metric::Temperature,
            Metric::Temperature => Metric::Utilization,
        }
    }
}

/// Display band for a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Low,
    Moderate,
    High,
}

impl Level {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Level::Low => "LOW",
            Level::Moderate => "MED",
            Level::High => "HIGH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_reads_each_metric() {
        let gpu = DeviceSnapshot::builder(0, "gpu")
            .utilization(55.0)
            .temperature(71.0)
            .memory(2048.0, 8192.0)
            .build();

        assert_eq!(Metric::Utilization.sample(&gpu), 55.0);
        assert_eq!(Metric::Memory.sample(&gpu), 25.0);
        assert_eq!(Metric::Temperature.sample(&gpu), 71.0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(Metric::Utilization.level(29.9), Level::Low);
        assert_eq!(Metric::Utilization.level(30.0), Level::Moderate);
        assert_eq!(Metric::Memory.level(70.0), Level::High);
        assert_eq!(Metric::Temperature.level(49.0), Level::Low);
        assert_eq!(Metric::Temperature.level(79.0), Level::Moderate);
        assert_eq!(Metric::Temperature.level(85.0), Level::High);
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut metric = Metric::Utilization;
        for expected in [Metric::Memory, Metric::Temperature, Metric::Utilization] {
            metric = metric.next();
            assert_eq!(metric, expected);
        }
    }
}
