use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

use common::models::{Signal, User};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A backend request described by the command layer. Builders stay pure so
/// they can be tested without any network; only `send_command` does I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.to_string(),
            body: Some(body),
        }
    }

    pub fn get(path: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub signals: Vec<Signal>,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub active_connections: Option<u64>,
}

/// REST client for the signal backend. All calls are single-shot JSON
/// request/response; the backend is the sole source of truth for whether
/// anything succeeded.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent("tradesigx_terminal/0.1.0")
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client."),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.get_json("/api/health", &[]).await
    }

    /// Scans all markets server-side; an empty signal list means nothing
    /// cleared the confidence bar, not an error.
    pub async fn market_scan(&self) -> Result<ScanResponse, BackendError> {
        self.get_json("/api/market-scan", &[]).await
    }

    /// Full snapshot of users, order as the backend returns them.
    pub async fn admin_users(&self, admin_id: &str) -> Result<Vec<User>, BackendError> {
        self.get_json("/api/admin/users", &[("admin_id", admin_id)])
            .await
    }

    /// Sends a request built by the command dispatch table and hands back the
    /// raw response value for the caller to read the success flag from.
    pub async fn send_command(&self, spec: &RequestSpec) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, spec.path);
        let request = match spec.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => {
                let mut request = self.client.post(&url);
                if let Some(body) = &spec.body {
                    request = request.json(body);
                }
                request
            }
        };

        Self::decode(request.send().await?).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Backend request failed: {} {}", status, body);
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}
