//! Record store gateway
//!
//! Typed GET/POST operations against the remote store. Every request after
//! authentication carries the bearer credential and JSON content
//! negotiation headers; non-2xx responses become structured transport
//! errors and are never retried here; the caller decides.

use crate::error::{AppError, AppResult};
use crate::session::{Credentials, Session};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Bounded per-request timeout. The store's query model gives no other
/// backstop against an unbounded hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP gateway to the record store.
pub struct RecordStoreGateway {
    client: Client,
    base_url: Url,
    session: Session,
}

impl RecordStoreGateway {
    /// Build the HTTP client and perform the one-time authentication
    /// exchange. An auth failure here aborts before any record work begins.
    pub async fn connect(base_url: Url, credentials: &Credentials) -> AppResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let session = Session::authenticate(&client, &base_url, credentials).await?;

        Ok(RecordStoreGateway {
            client,
            base_url,
            session,
        })
    }

    /// Fetch a resource. With a filter body the store's query model requires
    /// the predicates to travel in a request body, so the operation becomes
    /// a POST to the `filter/` sub-path; without one it is a plain GET.
    pub async fn fetch(&self, path: &str, filter: Option<&Value>) -> AppResult<Value> {
        match filter {
            Some(body) => {
                let path = format!("{}filter/", path);
                let request = self.client.post(self.url(&path)?).json(body);
                self.execute(&path, request).await
            }
            None => {
                let request = self.client.get(self.url(path)?);
                self.execute(path, request).await
            }
        }
    }

    /// POST a JSON body to a resource and return the raw JSON response.
    pub async fn send(&self, path: &str, body: &Value) -> AppResult<Value> {
        let request = self.client.post(self.url(path)?).json(body);
        self.execute(path, request).await
    }

    fn url(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid request path {}: {}", path, e)))
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> AppResult<Value> {
        let response = request
            .header(AUTHORIZATION, self.session.credential().header_value())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::into_json(path, response).await
    }

    async fn into_json(path: &str, response: Response) -> AppResult<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Transport {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Resource path for listing or creating items of an app.
pub fn item_path(app_id: u64) -> String {
    format!("item/app/{}/", app_id)
}

/// Resource path for an app's schema.
pub fn app_path(app_id: u64) -> String {
    format!("app/{}", app_id)
}

/// Resource path for creating tasks.
pub fn task_path() -> &'static str {
    "task/"
}
