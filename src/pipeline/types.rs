//! Shared types for the transform pipeline

use crate::error::{AppError, AppResult};
use crate::record::normalize_label;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Clone payload: destination `external_id` -> coerced value, ready to be
/// POSTed as a new item's `fields`.
pub type ClonePayload = Map<String, Value>;

/// One client-side predicate: the named field must equal the value exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    /// Normalized field key
    pub field: String,
    pub value: String,
}

/// Conjunction of predicates. A record matches only if every predicate
/// holds: exact equality, no partial matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate. The field may be given as a display label; it is
    /// normalized to the lookup key.
    pub fn require(mut self, field: &str, value: &str) -> Self {
        self.predicates.push(Predicate {
            field: normalize_label(field),
            value: value.to_string(),
        });
        self
    }

    /// Parse `"Label=Value"` pairs as supplied on the command line.
    pub fn parse(pairs: &[String]) -> AppResult<Self> {
        let mut spec = FilterSpec::new();
        for pair in pairs {
            let (field, value) = pair.split_once('=').ok_or_else(|| {
                AppError::Config(format!("invalid filter '{}', expected Label=Value", pair))
            })?;
            spec = spec.require(field.trim(), value.trim());
        }
        Ok(spec)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Derived follow-up task attached to a newly created item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub text: String,
    pub private: bool,
    pub ref_type: String,
    pub ref_id: i64,
    pub due_date: String,
}

/// Outcome status for one migrated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Clone created and follow-up task attached
    Succeeded,
    /// The clone create itself failed; no task was attempted
    CloneFailed,
    /// Clone created but the follow-up task could not be derived or sent
    TaskFailed,
}

/// Structured per-item outcome, replacing print-driven progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub item_id: Option<i64>,
    pub title: Option<String>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Terminal summary of a migration batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Items delivered by the source fetch, before dedupe/filtering
    pub fetched: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ItemOutcome>,
}

impl MigrationReport {
    pub fn from_outcomes(fetched: usize, outcomes: Vec<ItemOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        MigrationReport {
            fetched,
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            finished_at: Utc::now(),
            outcomes,
        }
    }
}

/// Outcome status for one imported CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Created,
    Failed,
}

/// Structured per-row outcome of a CSV import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    /// 1-based data row number (the header is not counted)
    pub row: usize,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Terminal summary of a CSV import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wholly empty rows, skipped before any create
    pub skipped: usize,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RowOutcome>,
}

impl ImportReport {
    pub fn from_outcomes(skipped: usize, outcomes: Vec<RowOutcome>) -> Self {
        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == RowStatus::Created)
            .count();
        ImportReport {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            skipped,
            finished_at: Utc::now(),
            outcomes,
        }
    }
}
