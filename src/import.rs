//! CSV import
//!
//! Maps tabular rows onto a destination app's schema by display label,
//! coercing types, and creates one item per row. Rows are submitted in
//! source order; a failed row is reported and subsequent rows still run.

use crate::config::ImportSpec;
use crate::error::{coercion_error, schema_mismatch_error, AppResult};
use crate::gateway::{item_path, RecordStoreGateway};
use crate::pipeline::types::{ClonePayload, ImportReport, RowOutcome, RowStatus};
use crate::record::FieldType;
use crate::schema::FieldDirectory;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Drives one CSV import run against the store.
pub struct CsvImporter<'a> {
    gateway: &'a RecordStoreGateway,
    spec: ImportSpec,
}

impl<'a> CsvImporter<'a> {
    pub fn new(gateway: &'a RecordStoreGateway, spec: ImportSpec) -> Self {
        CsvImporter { gateway, spec }
    }

    /// Run the import. The schema-directory fetch and an unreadable file
    /// are fatal; everything per-row is captured as an outcome.
    pub async fn run(&self) -> AppResult<ImportReport> {
        self.spec.validate()?;

        let directory = FieldDirectory::fetch(self.gateway, self.spec.app).await?;
        info!(
            "importing {} into app {}",
            self.spec.csv_path.display(),
            self.spec.app
        );

        let mut reader = csv::Reader::from_path(&self.spec.csv_path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut outcomes = Vec::new();
        let mut skipped = 0usize;

        for (index, result) in reader.records().enumerate() {
            let row = index + 1;

            let cells: Vec<String> = match result {
                Ok(record) => record.iter().map(str::to_string).collect(),
                Err(e) => {
                    warn!(row, error = %e, "unreadable row");
                    outcomes.push(RowOutcome {
                        row,
                        status: RowStatus::Failed,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            match row_payload(&headers, &cells, &directory) {
                Ok(None) => {
                    debug!(row, "skipping empty row");
                    skipped += 1;
                }
                Ok(Some(payload)) => {
                    let outcome = match self
                        .gateway
                        .send(&item_path(self.spec.app), &json!({ "fields": payload }))
                        .await
                    {
                        Ok(_) => RowOutcome {
                            row,
                            status: RowStatus::Created,
                            error: None,
                        },
                        Err(e) => {
                            warn!(row, error = %e, "row create failed");
                            RowOutcome {
                                row,
                                status: RowStatus::Failed,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(row, error = %e, "row rejected");
                    outcomes.push(RowOutcome {
                        row,
                        status: RowStatus::Failed,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(ImportReport::from_outcomes(skipped, outcomes))
    }
}

/// Map one CSV row onto destination field identifiers.
///
/// Returns `Ok(None)` for a wholly empty row. A header label with no
/// destination field, or a non-numeric cell under a numeric field, fails
/// the row.
pub fn row_payload(
    headers: &[String],
    cells: &[String],
    directory: &FieldDirectory,
) -> AppResult<Option<ClonePayload>> {
    if cells.iter().all(|cell| cell.is_empty()) {
        return Ok(None);
    }

    let mut payload = ClonePayload::new();

    for (column, header) in headers.iter().enumerate() {
        let Some(cell) = cells.get(column) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }

        let descriptor = directory.by_label(header).ok_or_else(|| {
            schema_mismatch_error(format!("no destination field labeled '{}'", header))
        })?;

        let value = if descriptor.field_type == FieldType::Number {
            let number: f64 = cell.parse().map_err(|_| {
                coercion_error(format!("'{}' is not numeric for field '{}'", cell, header))
            })?;
            Value::from(number)
        } else {
            Value::from(cell.as_str())
        };

        payload.insert(descriptor.external_id.clone(), value);
    }

    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credentials;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;
    use url::Url;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn directory() -> FieldDirectory {
        FieldDirectory::from_fields(&[
            json!({"config": {"label": "Title"}, "type": "text", "external_id": "title"}),
            json!({"config": {"label": "Budget"}, "type": "number", "external_id": "budget"}),
        ])
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_row_maps_labels_and_coerces_numbers() {
        let payload = row_payload(
            &strings(&["Title", "Budget"]),
            &strings(&["Spring Gala", "1200.50"]),
            &directory(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(payload.get("title"), Some(&json!("Spring Gala")));
        assert_eq!(payload.get("budget"), Some(&json!(1200.50)));
    }

    #[test]
    fn test_wholly_empty_row_produces_no_payload() {
        let payload = row_payload(
            &strings(&["Title", "Budget"]),
            &strings(&["", ""]),
            &directory(),
        )
        .unwrap();

        assert_eq!(payload, None);
    }

    #[test]
    fn test_empty_cells_are_omitted_from_payload() {
        let payload = row_payload(
            &strings(&["Title", "Budget"]),
            &strings(&["Spring Gala", ""]),
            &directory(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(payload.len(), 1);
        assert!(payload.get("budget").is_none());
    }

    #[test]
    fn test_non_numeric_cell_fails_the_row() {
        let err = row_payload(
            &strings(&["Title", "Budget"]),
            &strings(&["Spring Gala", "lots"]),
            &directory(),
        )
        .unwrap_err();

        assert!(!err.is_fatal());
        assert!(err.to_string().contains("not numeric"));
    }

    #[test]
    fn test_unknown_header_fails_the_row() {
        let err = row_payload(
            &strings(&["Mystery"]),
            &strings(&["value"]),
            &directory(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("Mystery"));
    }

    #[test]
    fn test_short_row_ignores_missing_trailing_cells() {
        let payload = row_payload(
            &strings(&["Title", "Budget"]),
            &strings(&["Spring Gala"]),
            &directory(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(payload.len(), 1);
    }

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let csv_path = std::env::temp_dir().join(name);
        std::fs::write(&csv_path, contents).unwrap();
        csv_path
    }

    async fn connected_gateway(server: &MockServer) -> RecordStoreGateway {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "test-token"})),
            )
            .mount(server)
            .await;

        let base_url: Url = server.uri().parse().unwrap();
        let credentials = Credentials {
            username: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
            client_id: "itemflow".to_string(),
            client_secret: "s3cret".to_string(),
        };
        RecordStoreGateway::connect(base_url, &credentials)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_failed_row_does_not_stop_the_import() {
        let server = MockServer::start().await;
        let gateway = connected_gateway(&server).await;

        Mock::given(method("GET"))
            .and(path("/app/33"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fields": [
                    {"config": {"label": "Title"}, "type": "text", "external_id": "title"},
                    {"config": {"label": "Budget"}, "type": "number", "external_id": "budget"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/item/app/33/"))
            .and(body_partial_json(json!({"fields": {"title": "Bad Row"}})))
            .respond_with(ResponseTemplate::new(500).set_body_string("store exploded"))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/item/app/33/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"item_id": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let csv_path = temp_csv(
            "itemflow_import_partial_failure.csv",
            "Title,Budget\nGala,100\nBad Row,200\n,\nAuction,300\n",
        );
        let spec = ImportSpec {
            app: 33,
            csv_path: csv_path.clone(),
        };

        let report = CsvImporter::new(&gateway, spec).run().await.unwrap();
        std::fs::remove_file(csv_path).unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);

        assert_eq!(report.outcomes[0].row, 1);
        assert_eq!(report.outcomes[0].status, RowStatus::Created);
        assert_eq!(report.outcomes[1].row, 2);
        assert_eq!(report.outcomes[1].status, RowStatus::Failed);
        assert!(report.outcomes[1]
            .error
            .as_deref()
            .unwrap()
            .contains("store exploded"));
        assert_eq!(report.outcomes[2].row, 4);
        assert_eq!(report.outcomes[2].status, RowStatus::Created);
    }
}
