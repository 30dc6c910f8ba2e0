//! Follow-up task derivation
//!
//! Computes the agenda task attached to each newly created item: title from
//! the item's own title, due date exactly seven days before the start of
//! its meeting-date field.

use crate::error::{coercion_error, AppError, AppResult};
use crate::pipeline::types::TaskSpec;
use crate::record::Record;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

/// Lead time between the derived task's due date and the meeting start.
const TASK_LEAD_SECONDS: i64 = 604_800; // 7 days

/// Derive the follow-up task for a newly created record.
///
/// A missing item id, or a missing/unparsable date field, is fatal for this
/// record's task step only; the caller continues with the next record.
pub fn derive_task(record: &Record, title_key: &str, date_key: &str) -> AppResult<TaskSpec> {
    let ref_id = record
        .item_id
        .ok_or_else(|| AppError::NotFound("created item carries no item_id".to_string()))?;

    let title = record
        .raw
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            record
                .value(title_key)
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default();

    let start = record
        .value(date_key)
        .and_then(|v| v.get("start"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            coercion_error(format!("item {} has no '{}' start to derive a due date", ref_id, date_key))
        })?;

    Ok(TaskSpec {
        text: format!("Create Agenda for {}", title),
        private: false,
        ref_type: "item".to_string(),
        ref_id,
        due_date: due_date_from_start(start)?,
    })
}

/// Parse a date field's `start` instant and step back the task lead time,
/// formatted as a plain calendar date. No timezone adjustment beyond the
/// subtraction.
pub fn due_date_from_start(start: &str) -> AppResult<String> {
    let parsed = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(start, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|e| coercion_error(format!("unparsable date '{}': {}", start, e)))?;

    let due = parsed - Duration::seconds(TASK_LEAD_SECONDS);
    Ok(due.format("%Y-%m-%d").to_string())
}
