//! JSON export of the fleet state.
//!
//! Used by `--export` (one fetch, no history) and by the `e` key in the TUI
//! (current session, including history).

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use gpuwatch_types::{DeviceSnapshot, Recommendation};
use serde_json::{json, Map, Value};

use crate::data::{FleetSummary, HistoryStore, Metric};

/// Build the export document.
pub fn report(
    snapshots: &[DeviceSnapshot],
    summary: &FleetSummary,
    history: Option<&HistoryStore>,
) -> Value {
    let mut export = Map::new();

    export.insert("summary".to_string(), json!(summary));

    let devices: Vec<Value> = snapshots
        .iter()
        .map(|gpu| {
            json!({
                "index": gpu.index,
                "name": gpu.name,
                "utilization_percent": gpu.utilization_percent,
                "temperature_c": gpu.temperature_c,
                "memory_percent": gpu.memory_percent(),
                "used_memory_mb": gpu.used_memory_mb,
                "total_memory_mb": gpu.total_memory_mb,
                "free_memory_mb": gpu.free_memory_mb,
            })
        })
        .collect();
    export.insert("devices".to_string(), Value::Array(devices));

    if let Some(history) = history {
        export.insert("history".to_string(), history_json(history));
    }

    Value::Object(export)
}

/// History as `{ "<index>": { "name": .., "utilization": [{label, value}, ..], .. } }`.
fn history_json(history: &HistoryStore) -> Value {
    let mut devices = Map::new();
    for index in history.device_indices() {
        let Some(device) = history.device(index) else {
            continue;
        };
        let mut entry = Map::new();
        entry.insert("name".to_string(), json!(device.name));
        for metric in Metric::ALL {
            let points: Vec<Value> = history
                .series_for(index, metric)
                .iter()
                .map(|p| json!({ "label": p.label, "value": p.value }))
                .collect();
            entry.insert(metric.name().to_string(), Value::Array(points));
        }
        devices.insert(index.to_string(), Value::Object(entry));
    }
    Value::Object(devices)
}

/// Recommendation outcome for the export and the status bar.
pub fn recommendation_json(recommendation: &Recommendation) -> Value {
    match recommendation {
        Recommendation::Found { device_index, info } => json!({
            "found": true,
            "gpu_index": device_index,
            "name": info.as_ref().map(|gpu| gpu.name.clone()),
        }),
        Recommendation::NotFound { message } => json!({
            "found": false,
            "message": message,
        }),
    }
}

/// Write a document as pretty-printed JSON.
pub fn write_json(path: &Path, document: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_without_history() {
        let fleet = [DeviceSnapshot::builder(0, "A100")
            .utilization(50.0)
            .memory(1024.0, 4096.0)
            .build()];
        let summary = FleetSummary::from_snapshots(&fleet);

        let doc = report(&fleet, &summary, None);
        assert_eq!(doc["summary"]["device_count"], 1);
        assert_eq!(doc["devices"][0]["name"], "A100");
        assert_eq!(doc["devices"][0]["memory_percent"], 25.0);
        assert!(doc.get("history").is_none());
    }

    #[test]
    fn test_report_with_history_and_write() {
        let fleet = [DeviceSnapshot::builder(3, "L4").utilization(10.0).build()];
        let mut history = HistoryStore::new();
        history.observe(&fleet, "12:00:00");
        history.observe(&fleet, "12:00:05");

        let doc = report(&fleet, &FleetSummary::from_snapshots(&fleet), Some(&history));
        let util = &doc["history"]["3"]["utilization"];
        assert_eq!(util.as_array().map(Vec::len), Some(2));
        assert_eq!(util[1]["label"], "12:00:05");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        write_json(&path, &doc).unwrap();
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, doc);
    }

    #[test]
    fn test_recommendation_json() {
        let doc = recommendation_json(&Recommendation::NotFound {
            message: "No suitable GPU found".to_string(),
        });
        assert_eq!(doc["found"], false);
        assert_eq!(doc["message"], "No suitable GPU found");
    }
}
