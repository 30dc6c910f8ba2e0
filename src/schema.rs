//! Destination schema directory
//!
//! Fetches an app's field definitions once per run and indexes them by
//! display label (CSV import path) and by normalized label (clone path).

use crate::error::{AppError, AppResult};
use crate::gateway::{app_path, RecordStoreGateway};
use crate::record::{normalize_label, FieldType};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// One destination field: the machine-stable key used to address it on
/// create, plus its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub external_id: String,
    pub field_type: FieldType,
}

/// Label-indexed directory of a destination app's fields.
///
/// Built once per destination app per run; read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct FieldDirectory {
    by_label: HashMap<String, FieldDescriptor>,
    by_key: HashMap<String, FieldDescriptor>,
}

impl FieldDirectory {
    /// Fetch and index the schema of an app. Failure here is fatal to the
    /// run: nothing can be created without the field directory.
    pub async fn fetch(gateway: &RecordStoreGateway, app_id: u64) -> AppResult<Self> {
        let raw = gateway.fetch(&app_path(app_id), None).await?;

        let fields = raw
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::SchemaMismatch(format!("app {} schema has no fields array", app_id))
            })?;

        let directory = Self::from_fields(fields);
        debug!(app_id, fields = directory.len(), "built field directory");
        Ok(directory)
    }

    /// Index a raw `fields` array of `{config: {label}, type, external_id}`
    /// entries. Entries lacking a label or external id are skipped.
    pub fn from_fields(fields: &[Value]) -> Self {
        let mut directory = FieldDirectory::default();

        for field in fields {
            let label = field
                .get("config")
                .and_then(|c| c.get("label"))
                .and_then(Value::as_str);
            let external_id = field.get("external_id").and_then(Value::as_str);

            let (Some(label), Some(external_id)) = (label, external_id) else {
                continue;
            };

            let descriptor = FieldDescriptor {
                external_id: external_id.to_string(),
                field_type: field
                    .get("type")
                    .and_then(Value::as_str)
                    .map(FieldType::parse)
                    .unwrap_or_else(|| FieldType::Other(String::new())),
            };

            directory
                .by_key
                .entry(normalize_label(label))
                .or_insert_with(|| descriptor.clone());
            directory
                .by_label
                .entry(label.to_string())
                .or_insert(descriptor);
        }

        directory
    }

    /// Resolve a field by its exact display label (CSV headers).
    pub fn by_label(&self, label: &str) -> Option<&FieldDescriptor> {
        self.by_label.get(label)
    }

    /// Resolve a field by normalized label (cross-schema clone).
    pub fn by_key(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_fields() -> Vec<Value> {
        vec![
            json!({"config": {"label": "Title"}, "type": "text", "external_id": "title"}),
            json!({"config": {"label": "Budget"}, "type": "number", "external_id": "budget"}),
            json!({"config": {"label": "Meeting Date"}, "type": "date", "external_id": "meeting-date"}),
        ]
    }

    #[test]
    fn test_directory_indexes_by_label_and_key() {
        let directory = FieldDirectory::from_fields(&sample_fields());

        assert_eq!(directory.len(), 3);
        assert_eq!(
            directory.by_label("Budget").unwrap().external_id,
            "budget"
        );
        assert_eq!(
            directory.by_key("meeting_date").unwrap().external_id,
            "meeting-date"
        );
        assert_eq!(
            directory.by_label("Budget").unwrap().field_type,
            FieldType::Number
        );
    }

    #[test]
    fn test_directory_skips_incomplete_entries() {
        let fields = vec![
            json!({"config": {}, "type": "text", "external_id": "orphan"}),
            json!({"config": {"label": "No Id"}, "type": "text"}),
            json!({"config": {"label": "Ok"}, "type": "text", "external_id": "ok"}),
        ];
        let directory = FieldDirectory::from_fields(&fields);

        assert_eq!(directory.len(), 1);
        assert!(directory.by_label("Ok").is_some());
    }

    #[test]
    fn test_unknown_label_resolves_to_none() {
        let directory = FieldDirectory::from_fields(&sample_fields());
        assert!(directory.by_label("Missing").is_none());
        assert!(directory.by_key("missing").is_none());
    }
}
