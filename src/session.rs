//! Session management
//!
//! Acquires and holds the bearer credential for the record store via a
//! single password-grant exchange. The credential is created once per run
//! and never refreshed: a run that outlives its validity fails outright.

use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// Operator-supplied credentials for the password-grant exchange.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// All four values are required, non-empty strings.
    pub fn validate(&self) -> AppResult<()> {
        let missing: Vec<&str> = [
            ("username", &self.username),
            ("password", &self.password),
            ("client id", &self.client_id),
            ("client secret", &self.client_secret),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!(
                "missing required credential(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Opaque bearer token issued by the store. Immutable for the lifetime of
/// the run.
#[derive(Debug, Clone)]
pub struct Credential(String);

impl Credential {
    /// Authorization header value carried by every authenticated request.
    pub fn header_value(&self) -> String {
        format!("OAuth2 {}", self.0)
    }
}

/// Authenticated session against the record store.
#[derive(Debug)]
pub struct Session {
    credential: Credential,
}

impl Session {
    /// Perform the form-encoded password-grant exchange against the store's
    /// token endpoint.
    ///
    /// Any non-2xx response, or a response body lacking `access_token`,
    /// yields an `Auth` error and aborts the run. No retry, no partial
    /// credential.
    pub async fn authenticate(
        client: &Client,
        base_url: &Url,
        credentials: &Credentials,
    ) -> AppResult<Self> {
        credentials.validate()?;

        let token_url = base_url
            .join("oauth/token")
            .map_err(|e| AppError::Config(format!("invalid base URL: {}", e)))?;

        debug!("requesting token from {}", token_url);

        let params = [
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];

        let response = client.post(token_url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::Auth(format!("malformed token response: {}", e)))?;

        let token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Auth("token response lacks access_token".to_string()))?;

        info!("authenticated against {}", base_url);

        Ok(Session {
            credential: Credential(token.to_string()),
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}
