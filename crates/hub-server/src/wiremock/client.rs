//! reqwest client for the `/__admin` endpoints of a WireMock instance.

use super::types::LoggedRequest;
use crate::config::WireMockConfig;
use crate::mapping::Mapping;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WireMockError {
    /// Connection refused, timeout, DNS failure and friends. Timeouts are
    /// indistinguishable from connection failures on purpose.
    #[error("{0}")]
    Transport(String),
    /// The admin API answered with a non-success status.
    #[error("WireMock admin API returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The admin API answered 2xx but the payload was not what we expected.
    #[error("Invalid response from WireMock admin API: {0}")]
    Decode(String),
}

impl WireMockError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WireMockError::Status { status: 404, .. })
    }
}

/// Client for one-or-many WireMock admin APIs. Cheap to clone; the base URL
/// is supplied per call because every project owns its own set of instances.
#[derive(Clone)]
pub struct WireMockClient {
    http: reqwest::Client,
    admin_timeout: Duration,
    health_timeout: Duration,
}

impl WireMockClient {
    pub fn new(config: &WireMockConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            admin_timeout: Duration::from_secs(config.admin_timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        }
    }

    fn admin_url(base: &str, path: &str) -> String {
        format!("{}/__admin/{path}", base.trim_end_matches('/'))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, WireMockError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(WireMockError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn json_body(response: reqwest::Response) -> Result<Value, WireMockError> {
        response
            .json()
            .await
            .map_err(|e| WireMockError::Decode(e.to_string()))
    }

    /// Probe instance health: a 200 from the mappings listing means the
    /// admin API is up. Never errors; down is just `false`.
    pub async fn is_healthy(&self, base: &str) -> bool {
        let url = Self::admin_url(base, "mappings");
        match self
            .http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health probe against {} failed: {}", base, e);
                false
            }
        }
    }

    /// All mappings currently live on the instance, passed through raw.
    pub async fn list_mappings(&self, base: &str) -> Result<Value, WireMockError> {
        let url = Self::admin_url(base, "mappings");
        let response = self
            .http
            .get(&url)
            .timeout(self.admin_timeout)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::json_body(Self::check_status(response).await?).await
    }

    /// Create a mapping; returns the stored mapping including the
    /// server-assigned id.
    pub async fn create_mapping(
        &self,
        base: &str,
        mapping: &Mapping,
    ) -> Result<Mapping, WireMockError> {
        let url = Self::admin_url(base, "mappings");
        let response = self
            .http
            .post(&url)
            .timeout(self.admin_timeout)
            .json(mapping)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        let body = Self::json_body(Self::check_status(response).await?).await?;
        serde_json::from_value(body).map_err(|e| WireMockError::Decode(e.to_string()))
    }

    /// Update a mapping the server already knows by its remote id.
    pub async fn update_mapping(
        &self,
        base: &str,
        remote_id: &str,
        mapping: &Mapping,
    ) -> Result<(), WireMockError> {
        let url = Self::admin_url(base, &format!("mappings/{remote_id}"));
        let response = self
            .http
            .put(&url)
            .timeout(self.admin_timeout)
            .json(mapping)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }

    /// `POST /__admin/mappings/reset` - wipe all mappings. Used as the
    /// precondition step of a batch sync.
    pub async fn reset_mappings(&self, base: &str) -> Result<(), WireMockError> {
        let url = Self::admin_url(base, "mappings/reset");
        let response = self
            .http
            .post(&url)
            .timeout(self.admin_timeout)
            .json(&Value::Object(Default::default()))
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }

    /// `DELETE /__admin/mappings` - the simpler full wipe used by the
    /// standalone "reset instance" operation.
    pub async fn delete_all_mappings(&self, base: &str) -> Result<(), WireMockError> {
        let url = Self::admin_url(base, "mappings");
        let response = self
            .http
            .delete(&url)
            .timeout(self.admin_timeout)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }

    /// The request journal, passed through raw.
    pub async fn list_requests(&self, base: &str) -> Result<Value, WireMockError> {
        let url = Self::admin_url(base, "requests");
        let response = self
            .http
            .get(&url)
            .timeout(self.admin_timeout)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::json_body(Self::check_status(response).await?).await
    }

    /// Unmatched journal entries, raw. Callers normalize with
    /// [`super::normalize_unmatched`].
    pub async fn list_unmatched_requests(&self, base: &str) -> Result<Value, WireMockError> {
        let url = Self::admin_url(base, "requests/unmatched");
        let response = self
            .http
            .get(&url)
            .timeout(self.admin_timeout)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::json_body(Self::check_status(response).await?).await
    }

    /// A single journal entry by id. A remote 404 surfaces as
    /// `WireMockError::Status { status: 404, .. }`.
    pub async fn get_request(
        &self,
        base: &str,
        request_id: &str,
    ) -> Result<LoggedRequest, WireMockError> {
        let url = Self::admin_url(base, &format!("requests/{request_id}"));
        let response = self
            .http
            .get(&url)
            .timeout(self.admin_timeout)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        let body = Self::json_body(Self::check_status(response).await?).await?;
        serde_json::from_value(body).map_err(|e| WireMockError::Decode(e.to_string()))
    }

    /// Clear the request journal.
    pub async fn clear_requests(&self, base: &str) -> Result<(), WireMockError> {
        let url = Self::admin_url(base, "requests");
        let response = self
            .http
            .delete(&url)
            .timeout(self.admin_timeout)
            .send()
            .await
            .map_err(|e| WireMockError::Transport(e.to_string()))?;
        Self::check_status(response).await.map(|_| ())
    }
}
