//! Deduplication, predicate filtering, and cross-schema clone extraction

use crate::error::{coercion_error, AppResult};
use crate::pipeline::types::{ClonePayload, FilterSpec};
use crate::record::{Field, FieldType, Record};
use crate::schema::FieldDirectory;
use serde_json::Value;
use tracing::{debug, warn};

/// Drop every record whose selector field value was already seen earlier in
/// the sequence. First-seen order is preserved; equality is value equality
/// on the unwrapped field value, falling back to the raw payload's
/// top-level key for stores that deliver the selector outside the field
/// list. Records with no value for the selector are all retained.
/// Idempotent.
pub fn dedupe(records: Vec<Record>, selector: &str) -> Vec<Record> {
    let mut seen: Vec<Value> = Vec::new();
    let before = records.len();

    let deduped: Vec<Record> = records
        .into_iter()
        .filter(|record| match record.value(selector).or_else(|| record.raw.get(selector)) {
            Some(value) => {
                if seen.contains(value) {
                    false
                } else {
                    seen.push(value.clone());
                    true
                }
            }
            None => true,
        })
        .collect();

    debug!(before, after = deduped.len(), selector, "deduped records");
    deduped
}

/// Keep-order subsequence of records for which every predicate holds.
/// A missing required field counts as a mismatch, never as an error.
pub fn filter(records: Vec<Record>, spec: &FilterSpec) -> Vec<Record> {
    if spec.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| {
            spec.predicates().iter().all(|predicate| {
                record
                    .value(&predicate.field)
                    .and_then(comparable_text)
                    .map(|text| text == predicate.value)
                    .unwrap_or(false)
            })
        })
        .collect()
}

/// Text form of an unwrapped field value used for predicate comparison.
/// Structured values (category selections) expose their display text.
fn comparable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Build a clone payload from a source record, remapping each field onto
/// the destination schema by normalized label and coercing by the
/// destination type.
///
/// Best-effort per field: a source field with no destination counterpart,
/// or one whose shape fails coercion, is omitted with a warning and the rest
/// of the record still clones.
pub fn extract_for_clone(record: &Record, directory: &FieldDirectory) -> ClonePayload {
    let mut payload = ClonePayload::new();

    for field in &record.fields {
        let Some(descriptor) = directory.by_key(&field.key) else {
            warn!(
                item_id = ?record.item_id,
                field = %field.label,
                "no destination field for source label, skipping"
            );
            continue;
        };

        match coerce(&descriptor.field_type, field) {
            Ok(Some(value)) => {
                payload.insert(descriptor.external_id.clone(), value);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    item_id = ?record.item_id,
                    field = %field.label,
                    error = %e,
                    "coercion failed, field omitted"
                );
            }
        }
    }

    payload
}

/// Coerce one source field value for the given destination type.
///
/// Returns `Ok(None)` when the field carries no value at all.
pub fn coerce(field_type: &FieldType, field: &Field) -> AppResult<Option<Value>> {
    if field.value.is_none() {
        return Ok(None);
    }

    let value = match field_type {
        FieldType::Date => {
            // both range ends must be present on the structured value
            let slot = field.value.as_ref().and_then(Value::as_object).ok_or_else(|| {
                coercion_error(format!("date field '{}' is not structured", field.label))
            })?;
            let start = slot.get("start").ok_or_else(|| {
                coercion_error(format!("date field '{}' lacks start", field.label))
            })?;
            let end = slot.get("end").ok_or_else(|| {
                coercion_error(format!("date field '{}' lacks end", field.label))
            })?;
            serde_json::json!({ "start": start, "end": end })
        }
        FieldType::Category => {
            // the numeric id of the selected option, never its display text
            field
                .unwrapped()
                .and_then(|v| v.get("id"))
                .filter(|id| id.is_number())
                .cloned()
                .ok_or_else(|| {
                    coercion_error(format!(
                        "category field '{}' has no numeric option id",
                        field.label
                    ))
                })?
        }
        _ => field
            .unwrapped()
            .cloned()
            .unwrap_or(Value::Null),
    };

    Ok(Some(value))
}
