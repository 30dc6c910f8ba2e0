//! Migration batch orchestration
//!
//! Sequences the end-to-end migrate workflow: fetch filtered source items
//! once, dedupe, filter, then clone each surviving record into the
//! destination app and attach its follow-up task. Records are processed
//! independently; one bad record never fails the batch.

use crate::config::MigrateSpec;
use crate::error::AppResult;
use crate::gateway::{item_path, task_path, RecordStoreGateway};
use crate::pipeline::tasks::derive_task;
use crate::pipeline::transform::{dedupe, extract_for_clone, filter};
use crate::pipeline::types::{ItemOutcome, MigrationReport, OutcomeStatus};
use crate::record::Record;
use crate::schema::FieldDirectory;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Drives one migration run against the store.
pub struct Migrator<'a> {
    gateway: &'a RecordStoreGateway,
    spec: MigrateSpec,
}

impl<'a> Migrator<'a> {
    pub fn new(gateway: &'a RecordStoreGateway, spec: MigrateSpec) -> Self {
        Migrator {
            gateway,
            spec: spec.normalized(),
        }
    }

    /// Run the batch. Only the source fetch and the destination schema
    /// fetch are fatal; everything per-record is captured as an outcome.
    pub async fn run(&self) -> AppResult<MigrationReport> {
        info!("requesting items from app {}", self.spec.source_app);

        let filter_body = self.spec.remote_filter_body();
        let raw = self
            .gateway
            .fetch(&item_path(self.spec.source_app), filter_body.as_ref())
            .await?;

        let items = raw
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_else(|| {
                warn!("source response carries no items array");
                Vec::new()
            });

        let records: Vec<Record> = items.into_iter().map(Record::parse).collect();
        let fetched = records.len();
        info!("fetched {} items", fetched);

        let records = dedupe(records, &self.spec.dedupe_field);
        let records = filter(records, &self.spec.filters);
        info!("{} items survive dedupe and filtering", records.len());

        let directory = FieldDirectory::fetch(self.gateway, self.spec.dest_app).await?;

        let mut outcomes = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            info!("posting {} of {}", index + 1, records.len());
            outcomes.push(self.process_record(record, &directory).await);
        }

        Ok(MigrationReport::from_outcomes(fetched, outcomes))
    }

    /// Clone one record and attach its follow-up task. Never returns an
    /// error: every failure mode becomes a structured outcome.
    async fn process_record(&self, record: &Record, directory: &FieldDirectory) -> ItemOutcome {
        let title = record.title();

        let payload = extract_for_clone(record, directory);
        let created = match self
            .gateway
            .send(&item_path(self.spec.dest_app), &json!({ "fields": payload }))
            .await
        {
            Ok(raw) => Record::parse(raw),
            Err(e) => {
                warn!(item_id = ?record.item_id, error = %e, "clone create failed");
                return ItemOutcome {
                    item_id: record.item_id,
                    title,
                    status: OutcomeStatus::CloneFailed,
                    error: Some(e.to_string()),
                };
            }
        };

        let task = match derive_task(
            &created,
            &self.spec.task_title_field,
            &self.spec.task_date_field,
        ) {
            Ok(task) => task,
            Err(e) => {
                warn!(item_id = ?created.item_id, error = %e, "task derivation failed");
                return ItemOutcome {
                    item_id: created.item_id,
                    title,
                    status: OutcomeStatus::TaskFailed,
                    error: Some(e.to_string()),
                };
            }
        };

        let task_body = match serde_json::to_value(&task) {
            Ok(body) => body,
            Err(e) => {
                return ItemOutcome {
                    item_id: created.item_id,
                    title,
                    status: OutcomeStatus::TaskFailed,
                    error: Some(e.to_string()),
                };
            }
        };

        if let Err(e) = self.gateway.send(task_path(), &task_body).await {
            warn!(item_id = ?created.item_id, error = %e, "task create failed");
            return ItemOutcome {
                item_id: created.item_id,
                title,
                status: OutcomeStatus::TaskFailed,
                error: Some(e.to_string()),
            };
        }

        ItemOutcome {
            item_id: created.item_id,
            title,
            status: OutcomeStatus::Succeeded,
            error: None,
        }
    }
}
