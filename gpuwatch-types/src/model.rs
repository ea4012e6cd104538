//! Model registry records.

/// A model registry entry as listed by the service.
///
/// Only the task label matters to gpuwatch; the remaining fields are kept
/// for display and export.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelRecord {
    #[cfg_attr(feature = "serde", serde(default))]
    pub model_id: String,
    pub model_name: Option<String>,
    pub framework: Option<String>,
    /// Task label such as `"text-generation"`; may be missing or empty.
    pub task: Option<String>,
}

impl ModelRecord {
    /// Create a record with only a task label set.
    pub fn with_task(task: Option<&str>) -> Self {
        Self {
            task: task.map(str::to_string),
            ..Self::default()
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let json = r#"{
            "id": 3,
            "model_id": "bert-base-uncased",
            "model_name": "bert",
            "model_path": "/app/models/bert",
            "task": null,
            "created_at": "2024-01-01T00:00:00"
        }"#;

        let model: ModelRecord = serde_json::from_str(json).unwrap();
        assert_eq!(model.model_id, "bert-base-uncased");
        assert!(model.task.is_none());
        assert!(model.framework.is_none());
    }
}
