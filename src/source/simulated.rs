//! Simulated fleet for `--demo` mode and local development.
//!
//! Produces deterministic, slowly varying readings so the UI can be
//! exercised without a device service.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use gpuwatch_types::{DeviceSnapshot, ModelRecord, Recommendation};

use super::{FetchError, ModelSource, RecommendationSource, SnapshotFetcher};

const TOTAL_MEMORY_MB: f64 = 8192.0;

/// A fake fleet of identical devices whose load follows a sine wave.
#[derive(Debug)]
pub struct SimulatedFleet {
    devices: u32,
    min_free_memory_mb: f64,
    step: AtomicU64,
}

impl SimulatedFleet {
    /// Create a fleet with `devices` simulated GPUs.
    pub fn new(devices: u32) -> Self {
        Self {
            devices,
            min_free_memory_mb: 2000.0,
            step: AtomicU64::new(0),
        }
    }

    /// Minimum free memory a device needs to be recommended.
    pub fn with_min_free_memory_mb(mut self, min: f64) -> Self {
        self.min_free_memory_mb = min;
        self
    }

    fn snapshot_at(&self, index: u32, step: u64) -> DeviceSnapshot {
        let phase = step as f64 * 0.4 + index as f64 * 1.3;
        let load = (phase.sin() + 1.0) / 2.0;
        let used = (512.0 + load * 6144.0).round();

        DeviceSnapshot::builder(index, format!("Simulated GPU {}", index))
            .utilization((load * 95.0 * 10.0).round() / 10.0)
            .temperature((40.0 + load * 45.0).round())
            .memory(used, TOTAL_MEMORY_MB)
            .build()
    }

    fn current(&self) -> Vec<DeviceSnapshot> {
        let step = self.step.load(Ordering::Relaxed);
        (0..self.devices)
            .map(|index| self.snapshot_at(index, step))
            .collect()
    }
}

/// Score used to pick the recommended device: free memory dominates, then
/// idle compute, then temperature headroom.
fn score(gpu: &DeviceSnapshot) -> f64 {
    let memory = gpu.free_memory_mb / gpu.total_memory_mb.max(1.0) * 100.0;
    let idle = 100.0 - gpu.utilization_percent;
    let cool = 100.0 - (gpu.temperature_c - 30.0).clamp(0.0, 70.0) * (100.0 / 70.0);
    0.6 * memory + 0.3 * idle + 0.1 * cool
}

#[async_trait]
impl SnapshotFetcher for SimulatedFleet {
    async fn fetch(&self) -> Result<Vec<DeviceSnapshot>, FetchError> {
        let snapshots = self.current();
        self.step.fetch_add(1, Ordering::Relaxed);
        Ok(snapshots)
    }

    fn description(&self) -> &str {
        "simulated fleet"
    }
}

#[async_trait]
impl RecommendationSource for SimulatedFleet {
    async fn recommend(&self) -> Result<Recommendation, FetchError> {
        let best = self
            .current()
            .into_iter()
            .filter(|gpu| gpu.free_memory_mb >= self.min_free_memory_mb)
            .max_by(|a, b| score(a).total_cmp(&score(b)));

        Ok(match best {
            Some(gpu) => Recommendation::Found {
                device_index: gpu.index,
                info: Some(gpu),
            },
            None => Recommendation::NotFound {
                message: "No suitable GPU found".to_string(),
            },
        })
    }
}

#[async_trait]
impl ModelSource for SimulatedFleet {
    async fn models(&self) -> Result<Vec<ModelRecord>, FetchError> {
        let model = |id: &str, framework: &str, task: Option<&str>| ModelRecord {
            model_id: id.to_string(),
            model_name: Some(id.to_string()),
            framework: Some(framework.to_string()),
            task: task.map(str::to_string),
        };
        Ok(vec![
            model("bert-base-uncased", "transformers", Some("nlp")),
            model("gpt2", "transformers", Some("nlp")),
            model("resnet50", "pytorch", Some("vision")),
            model("whisper-small", "transformers", Some("audio")),
            model("custom-checkpoint", "pytorch", None),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_is_deterministic_and_advances() {
        let a = SimulatedFleet::new(3);
        let b = SimulatedFleet::new(3);

        let first = a.fetch().await.unwrap();
        assert_eq!(first, b.fetch().await.unwrap());
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].index, 2);

        let second = a.fetch().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_readings_stay_in_range() {
        let fleet = SimulatedFleet::new(4);
        for _ in 0..50 {
            for gpu in fleet.fetch().await.unwrap() {
                assert!((0.0..=100.0).contains(&gpu.utilization_percent));
                assert_eq!(gpu.used_memory_mb + gpu.free_memory_mb, gpu.total_memory_mb);
            }
        }
    }

    #[tokio::test]
    async fn test_recommend_respects_minimum_memory() {
        let fleet = SimulatedFleet::new(2).with_min_free_memory_mb(TOTAL_MEMORY_MB + 1.0);
        assert!(!fleet.recommend().await.unwrap().is_found());

        let fleet = SimulatedFleet::new(2).with_min_free_memory_mb(0.0);
        assert!(fleet.recommend().await.unwrap().is_found());
    }
}
