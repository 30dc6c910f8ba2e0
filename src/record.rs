//! Record parsing module
//!
//! Parses raw JSON items delivered by the record store into typed `Record`s
//! with an ordered field list and a normalized-label lookup.

use serde_json::Value;
use tracing::warn;

/// Field types the store delivers. Anything outside the known set is kept
/// opaque so its value passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Category,
    Date,
    Number,
    Other(String),
}

impl FieldType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "text" => FieldType::Text,
            "category" => FieldType::Category,
            "date" => FieldType::Date,
            "number" => FieldType::Number,
            other => FieldType::Other(other.to_string()),
        }
    }
}

/// One typed, labeled value attached to a record.
///
/// `value` holds the raw first value slot as delivered by the store; use
/// [`Field::unwrapped`] for the promoted scalar form.
#[derive(Debug, Clone)]
pub struct Field {
    /// Display label as delivered by the store
    pub label: String,
    /// Normalized lookup key derived from the label
    pub key: String,
    pub field_type: FieldType,
    /// Raw first value slot (`values[0]`), if any
    pub value: Option<Value>,
}

impl Field {
    /// Unwrap the first value slot: a structured object carrying a `value`
    /// sub-key is promoted to that sub-value, anything else is used verbatim.
    pub fn unwrapped(&self) -> Option<&Value> {
        let value = self.value.as_ref()?;
        match value.as_object() {
            Some(obj) if obj.contains_key("value") => obj.get("value"),
            _ => Some(value),
        }
    }
}

/// One remote item, parsed from the store's raw JSON representation.
///
/// The original payload is retained because filtering, deduping, and cloning
/// may need parts that were not promoted to typed accessors.
#[derive(Debug, Clone)]
pub struct Record {
    /// Stable store-assigned identifier
    pub item_id: Option<i64>,
    /// Identifier of the enclosing collection the record belongs to
    pub app_item_id: Option<i64>,
    /// Ordered field list as delivered by the store
    pub fields: Vec<Field>,
    /// Original unparsed payload
    pub raw: Value,
}

impl Record {
    /// Parse a raw JSON item into a typed record.
    ///
    /// A missing or malformed `fields` array is treated as an empty field
    /// set, never an error.
    pub fn parse(raw: Value) -> Record {
        let item_id = raw.get("item_id").and_then(Value::as_i64);
        let app_item_id = raw.get("app_item_id").and_then(Value::as_i64);

        let mut fields = Vec::new();
        if let Some(raw_fields) = raw.get("fields").and_then(Value::as_array) {
            for raw_field in raw_fields {
                let label = raw_field
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let key = normalize_label(&label);
                let field_type = raw_field
                    .get("type")
                    .and_then(Value::as_str)
                    .map(FieldType::parse)
                    .unwrap_or_else(|| FieldType::Other(String::new()));
                let value = raw_field
                    .get("values")
                    .and_then(Value::as_array)
                    .and_then(|values| values.first())
                    .cloned();

                if fields.iter().any(|f: &Field| f.key == key) {
                    warn!(
                        item_id = ?item_id,
                        key = %key,
                        label = %label,
                        "duplicate normalized field key, first occurrence wins"
                    );
                }

                fields.push(Field {
                    label,
                    key,
                    field_type,
                    value,
                });
            }
        }

        Record {
            item_id,
            app_item_id,
            fields,
            raw,
        }
    }

    /// Look up a field by normalized label. When two raw labels normalize to
    /// the same key, the first-parsed occurrence wins.
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Unwrapped value of a field, by normalized label.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.field(key).and_then(Field::unwrapped)
    }

    /// Item title: the store delivers it as a top-level `title` key on the
    /// raw payload; fall back to a `title` field for stores that only
    /// deliver it as a field.
    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.raw.get("title").and_then(Value::as_str) {
            return Some(title.to_string());
        }
        self.value("title")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Normalize a display label into a lookup key: split on whitespace, drop
/// tokens containing no word characters, join with underscores, lowercase.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|token| token.chars().any(|c| c.is_alphanumeric() || c == '_'))
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Scheduling Status"), "scheduling_status");
        assert_eq!(normalize_label("Title"), "title");
        assert_eq!(normalize_label("Time Date of Meeting"), "time_date_of_meeting");
    }

    #[test]
    fn test_normalize_label_drops_symbol_only_tokens() {
        assert_eq!(normalize_label("Budget ($) Total"), "budget_total");
        assert_eq!(normalize_label("- - -"), "");
    }

    #[test]
    fn test_parse_promotes_value_subkey() {
        let record = Record::parse(json!({
            "item_id": 7,
            "fields": [
                {"label": "Title", "type": "text", "values": [{"value": "Board Meeting"}]}
            ]
        }));

        assert_eq!(record.item_id, Some(7));
        assert_eq!(record.value("title"), Some(&json!("Board Meeting")));
    }

    #[test]
    fn test_parse_keeps_structured_values_reachable() {
        let record = Record::parse(json!({
            "fields": [
                {"label": "Meeting Date", "type": "date",
                 "values": [{"start": "2024-03-10 09:00:00", "end": "2024-03-10 10:00:00"}]}
            ]
        }));

        // no `value` sub-key, so the structured slot is used verbatim
        let value = record.value("meeting_date").unwrap();
        assert_eq!(value["start"], json!("2024-03-10 09:00:00"));
        assert_eq!(value["end"], json!("2024-03-10 10:00:00"));
    }

    #[test]
    fn test_duplicate_normalized_labels_first_wins() {
        let record = Record::parse(json!({
            "fields": [
                {"label": "Scheduling Status", "type": "text", "values": [{"value": "first"}]},
                {"label": "scheduling   status", "type": "text", "values": [{"value": "second"}]}
            ]
        }));

        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.value("scheduling_status"), Some(&json!("first")));
    }

    #[test]
    fn test_missing_fields_array_is_empty_set() {
        let record = Record::parse(json!({"item_id": 1}));
        assert!(record.fields.is_empty());

        let record = Record::parse(json!({"item_id": 1, "fields": null}));
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_title_prefers_raw_payload() {
        let record = Record::parse(json!({
            "title": "From Raw",
            "fields": [
                {"label": "Title", "type": "text", "values": [{"value": "From Field"}]}
            ]
        }));
        assert_eq!(record.title(), Some("From Raw".to_string()));

        let record = Record::parse(json!({
            "fields": [
                {"label": "Title", "type": "text", "values": [{"value": "From Field"}]}
            ]
        }));
        assert_eq!(record.title(), Some("From Field".to_string()));
    }

    #[test]
    fn test_field_type_from_str() {
        assert_eq!(FieldType::parse("text"), FieldType::Text);
        assert_eq!(FieldType::parse("category"), FieldType::Category);
        assert_eq!(FieldType::parse("date"), FieldType::Date);
        assert_eq!(FieldType::parse("number"), FieldType::Number);
        assert_eq!(
            FieldType::parse("embed"),
            FieldType::Other("embed".to_string())
        );
    }
}
