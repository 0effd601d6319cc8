//! Narrow interface to the (out-of-scope) admin HTTP surface.
//!
//! Tool handlers and the resource provider consume this trait; the
//! [`HttpAdminClient`] implementation talks to a running mockd admin API
//! over `reqwest`. Connectivity failures are classified so tool results can
//! carry an actionable message instead of a bare transport error.

use async_trait::async_trait;
use mockd_core::{Mock, MockKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Result alias for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;

/// Substrings that identify a connectivity failure rather than an
/// application-level error.
const CONNECTIVITY_MARKERS: &[&str] = &[
    "connection refused",
    "no such host",
    "dial tcp",
    "network is unreachable",
    "i/o timeout",
    "context deadline exceeded",
    "error trying to connect",
    "dns error",
    "timed out",
];

/// Errors from the admin seam.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    /// The admin server could not be reached at all.
    #[error("cannot reach the mockd admin API at {url} ({detail}); is the server running?")]
    Unreachable { url: String, detail: String },

    /// The admin server answered with an unexpected status.
    #[error("admin API returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not decode.
    #[error("failed to decode admin response: {0}")]
    Decode(String),
}

impl AdminError {
    /// Whether this is an upstream-unreachable condition.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Classify a transport error string as a connectivity failure.
pub(crate) fn is_connectivity_error(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    CONNECTIVITY_MARKERS.iter().any(|m| lower.contains(m))
}

/// Compact listing entry for a registered mock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSummary {
    pub id: String,
    pub kind: MockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// The admin operations the MCP runtime depends on.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn list_mocks(&self) -> AdminResult<Vec<MockSummary>>;
    async fn get_mock(&self, id: &str) -> AdminResult<Option<Mock>>;
    async fn create_mock(&self, mock: Mock) -> AdminResult<Mock>;
    async fn update_mock(&self, id: &str, mock: Mock) -> AdminResult<Mock>;
    async fn delete_mock(&self, id: &str) -> AdminResult<()>;

    async fn stateful_resources(&self) -> AdminResult<Vec<String>>;
    async fn stateful_resource(&self, name: &str) -> AdminResult<Option<Value>>;
    async fn chaos_snapshot(&self) -> AdminResult<Value>;
    async fn verification(&self, id: &str) -> AdminResult<Option<Value>>;
    async fn request_log(&self) -> AdminResult<Value>;
    async fn config_snapshot(&self) -> AdminResult<Value>;
    async fn contexts(&self) -> AdminResult<Value>;
}

/// `reqwest`-backed admin client.
#[derive(Debug, Clone)]
pub struct HttpAdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAdminClient {
    /// Default request timeout for admin calls.
    pub const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl Into<String>) -> AdminResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| AdminError::Decode(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn transport_error(&self, error: &reqwest::Error) -> AdminError {
        let mut detail = error.to_string();
        let mut source: Option<&(dyn std::error::Error + 'static)> =
            std::error::Error::source(error);
        while let Some(inner) = source {
            detail = inner.to_string();
            source = inner.source();
        }

        if error.is_connect() || error.is_timeout() || is_connectivity_error(&detail) {
            AdminError::Unreachable {
                url: self.base_url.clone(),
                detail,
            }
        } else {
            AdminError::Decode(detail)
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> AdminResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AdminResult<T> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdminError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        response
            .json()
            .await
            .map_err(|e| AdminError::Decode(e.to_string()))
    }

    async fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> AdminResult<Option<T>> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.decode(response).await.map(Some)
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn list_mocks(&self) -> AdminResult<Vec<MockSummary>> {
        self.get_json("/api/mocks").await
    }

    async fn get_mock(&self, id: &str) -> AdminResult<Option<Mock>> {
        self.get_optional(&format!("/api/mocks/{id}")).await
    }

    async fn create_mock(&self, mock: Mock) -> AdminResult<Mock> {
        let response = self
            .http
            .post(self.url("/api/mocks"))
            .json(&mock)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.decode(response).await
    }

    async fn update_mock(&self, id: &str, mock: Mock) -> AdminResult<Mock> {
        let response = self
            .http
            .put(self.url(&format!("/api/mocks/{id}")))
            .json(&mock)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.decode(response).await
    }

    async fn delete_mock(&self, id: &str) -> AdminResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/api/mocks/{id}")))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        // deletion is idempotent; a missing mock is not an error
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            debug!(id, status = status.as_u16(), "mock deleted");
            Ok(())
        } else {
            Err(AdminError::Status {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn stateful_resources(&self) -> AdminResult<Vec<String>> {
        self.get_json("/api/stateful").await
    }

    async fn stateful_resource(&self, name: &str) -> AdminResult<Option<Value>> {
        self.get_optional(&format!("/api/stateful/{name}")).await
    }

    async fn chaos_snapshot(&self) -> AdminResult<Value> {
        self.get_json("/api/chaos").await
    }

    async fn verification(&self, id: &str) -> AdminResult<Option<Value>> {
        self.get_optional(&format!("/api/mocks/{id}/verification")).await
    }

    async fn request_log(&self) -> AdminResult<Value> {
        self.get_json("/api/logs/summary").await
    }

    async fn config_snapshot(&self) -> AdminResult<Value> {
        self.get_json("/api/config").await
    }

    async fn contexts(&self) -> AdminResult<Value> {
        self.get_json("/api/contexts").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_markers_are_recognized() {
        assert!(is_connectivity_error("tcp connect error: Connection refused (os error 111)"));
        assert!(is_connectivity_error("dial tcp 127.0.0.1:8080: connect failed"));
        assert!(is_connectivity_error("lookup failed: no such host"));
        assert!(is_connectivity_error("operation timed out"));
        assert!(!is_connectivity_error("422 unprocessable entity"));
    }

    #[test]
    fn unreachable_message_names_the_url() {
        let err = AdminError::Unreachable {
            url: "http://localhost:4100".into(),
            detail: "connection refused".into(),
        };
        let text = err.to_string();
        assert!(text.contains("http://localhost:4100"));
        assert!(text.contains("is the server running?"));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = HttpAdminClient::new("http://localhost:4100/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:4100");
        assert_eq!(client.url("/api/mocks"), "http://localhost:4100/api/mocks");
    }
}
