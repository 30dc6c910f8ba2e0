//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP {status} for {path}: {body}")]
    Transport {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Coercion error: {0}")]
    Coercion(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    /// Whether this error is fatal to the whole run by category. Auth and
    /// config failures can never be scoped to a single record, row, or
    /// field; transport errors are fatal or not depending on the call site.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Auth(_) | AppError::Config(_))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a coercion error
pub fn coercion_error(msg: impl Into<String>) -> AppError {
    AppError::Coercion(msg.into())
}

/// Helper function to create a schema mismatch error
pub fn schema_mismatch_error(msg: impl Into<String>) -> AppError {
    AppError::SchemaMismatch(msg.into())
}
