//! Application configuration module
//!
//! Explicit configuration passed into the pipeline at construction: no
//! hardcoded field ids or filter values sprinkled through run variants.
//! Values come from CLI flags with environment fallbacks (a `.env` file is
//! honored).

use crate::error::{AppError, AppResult};
use crate::pipeline::types::FilterSpec;
use crate::record::normalize_label;
use crate::session::Credentials;
use serde_json::Value;
use std::path::PathBuf;
use url::Url;

/// Default remote store endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.podio.com";

/// Default dedupe selector and task title field.
pub const DEFAULT_TITLE_FIELD: &str = "title";

/// Default well-known label of the date field driving task due dates.
pub const DEFAULT_TASK_DATE_FIELD: &str = "time_date_of_meeting";

/// Connection settings shared by both workflows.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    pub credentials: Credentials,
}

impl Settings {
    pub fn new(base_url: &str, credentials: Credentials) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        credentials.validate()?;

        Ok(Settings {
            base_url,
            credentials,
        })
    }
}

/// Everything the migration workflow needs, enumerated up front.
#[derive(Debug, Clone)]
pub struct MigrateSpec {
    pub source_app: u64,
    pub dest_app: u64,
    /// Normalized label of the dedupe selector field
    pub dedupe_field: String,
    /// Client-side predicates applied after the fetch
    pub filters: FilterSpec,
    /// Server-side filter: field id -> required values, sent in the fetch body
    pub remote_filters: Vec<(String, Vec<Value>)>,
    /// Normalized label of the field feeding the task title fallback
    pub task_title_field: String,
    /// Normalized label of the date field driving task due dates
    pub task_date_field: String,
}

impl MigrateSpec {
    /// Encode the server-side filter as the store's query body:
    /// `{"filters": {fieldId: [values]}}`. `None` when no remote filter is
    /// configured, which turns the fetch into a plain GET.
    pub fn remote_filter_body(&self) -> Option<Value> {
        if self.remote_filters.is_empty() {
            return None;
        }

        let filters: serde_json::Map<String, Value> = self
            .remote_filters
            .iter()
            .map(|(field_id, values)| (field_id.clone(), Value::Array(values.clone())))
            .collect();

        Some(serde_json::json!({ "filters": filters }))
    }

    /// Parse `"fieldId=v1,v2"` pairs as supplied on the command line.
    /// Numeric values stay numeric on the wire; anything else is passed as
    /// a string.
    pub fn parse_remote_filters(pairs: &[String]) -> AppResult<Vec<(String, Vec<Value>)>> {
        pairs
            .iter()
            .map(|pair| {
                let (field_id, values) = pair.split_once('=').ok_or_else(|| {
                    AppError::Config(format!(
                        "invalid remote filter '{}', expected fieldId=v1,v2",
                        pair
                    ))
                })?;

                let values: Vec<Value> = values
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| match v.parse::<i64>() {
                        Ok(n) => Value::from(n),
                        Err(_) => Value::from(v),
                    })
                    .collect();

                if values.is_empty() {
                    return Err(AppError::Config(format!(
                        "remote filter '{}' has no values",
                        pair
                    )));
                }

                Ok((field_id.trim().to_string(), values))
            })
            .collect()
    }

    /// Normalize the operator-facing field selectors so lookups hit the
    /// record's normalized keys.
    pub fn normalized(mut self) -> Self {
        self.dedupe_field = normalize_label(&self.dedupe_field);
        self.task_title_field = normalize_label(&self.task_title_field);
        self.task_date_field = normalize_label(&self.task_date_field);
        self
    }
}

/// Everything the CSV import workflow needs.
#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub app: u64,
    pub csv_path: PathBuf,
}

impl ImportSpec {
    pub fn validate(&self) -> AppResult<()> {
        if !self.csv_path.exists() {
            return Err(AppError::Config(format!(
                "import file not found: {}",
                self.csv_path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            username: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
            client_id: "itemflow".to_string(),
            client_secret: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_settings_rejects_bad_base_url() {
        assert!(Settings::new("not a url", credentials()).is_err());
        assert!(Settings::new(DEFAULT_BASE_URL, credentials()).is_ok());
    }

    #[test]
    fn test_settings_rejects_empty_credentials() {
        let mut creds = credentials();
        creds.username = String::new();
        assert!(Settings::new(DEFAULT_BASE_URL, creds).is_err());
    }

    #[test]
    fn test_parse_remote_filters() {
        let filters =
            MigrateSpec::parse_remote_filters(&["133224490=3".to_string()]).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].0, "133224490");
        assert_eq!(filters[0].1, vec![json!(3)]);
    }

    #[test]
    fn test_parse_remote_filters_mixed_values() {
        let filters =
            MigrateSpec::parse_remote_filters(&["status=3,confirmed".to_string()]).unwrap();
        assert_eq!(filters[0].1, vec![json!(3), json!("confirmed")]);
    }

    #[test]
    fn test_parse_remote_filters_rejects_malformed() {
        assert!(MigrateSpec::parse_remote_filters(&["nope".to_string()]).is_err());
        assert!(MigrateSpec::parse_remote_filters(&["status=".to_string()]).is_err());
    }

    #[test]
    fn test_remote_filter_body_wire_format() {
        let spec = MigrateSpec {
            source_app: 1,
            dest_app: 2,
            dedupe_field: "title".to_string(),
            filters: FilterSpec::new(),
            remote_filters: vec![("133224490".to_string(), vec![json!(3)])],
            task_title_field: "title".to_string(),
            task_date_field: DEFAULT_TASK_DATE_FIELD.to_string(),
        };

        assert_eq!(
            spec.remote_filter_body(),
            Some(json!({"filters": {"133224490": [3]}}))
        );
    }

    #[test]
    fn test_remote_filter_body_absent_without_filters() {
        let spec = MigrateSpec {
            source_app: 1,
            dest_app: 2,
            dedupe_field: "title".to_string(),
            filters: FilterSpec::new(),
            remote_filters: vec![],
            task_title_field: "title".to_string(),
            task_date_field: DEFAULT_TASK_DATE_FIELD.to_string(),
        };

        assert_eq!(spec.remote_filter_body(), None);
    }

    #[test]
    fn test_normalized_selectors() {
        let spec = MigrateSpec {
            source_app: 1,
            dest_app: 2,
            dedupe_field: "Title".to_string(),
            filters: FilterSpec::new(),
            remote_filters: vec![],
            task_title_field: "Title".to_string(),
            task_date_field: "Time Date of Meeting".to_string(),
        }
        .normalized();

        assert_eq!(spec.dedupe_field, "title");
        assert_eq!(spec.task_date_field, "time_date_of_meeting");
    }
}
