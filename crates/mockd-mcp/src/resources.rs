//! The `mock://` resource space.
//!
//! Resources expose the server's current state to MCP clients: registered
//! mocks per protocol, stateful CRUD stores, the chaos configuration,
//! verification data, logs, and configuration snapshots. URI resolution is
//! a pure parser; everything it cannot name is a `ResourceNotFound`.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::admin::{AdminClient, MockSummary};
use crate::error::{McpError, McpResult};
use crate::types::{Resource, ResourceContent};
use mockd_core::MockKind;

/// A parsed `mock://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResourceUri {
    /// `mock://<path>#<METHOD>`
    HttpEndpoint { path: String, method: String },
    /// `mock://websocket<path>`
    WebSocket { path: String },
    /// `mock://graphql<path>`
    GraphQl { path: String },
    /// `mock://soap<path>`
    Soap { path: String },
    /// `mock://grpc/<id>`
    Grpc { id: String },
    /// `mock://mqtt/<id>`
    Mqtt { id: String },
    /// `mock://oauth/<id>`
    OAuth { id: String },
    /// `mock://stateful/<name>`
    Stateful { name: String },
    /// `mock://chaos`
    Chaos,
    /// `mock://verification/<id>`
    Verification { id: String },
    /// `mock://logs`
    Logs,
    /// `mock://config`
    Config,
    /// `mock://context`
    Context,
}

impl MockResourceUri {
    /// Parse a `mock://` URI. Unknown shapes are `ResourceNotFound`.
    pub fn parse(uri: &str) -> McpResult<Self> {
        let not_found = || McpError::ResourceNotFound { uri: uri.into() };
        let rest = uri.strip_prefix("mock://").ok_or_else(not_found)?;

        match rest {
            "chaos" => return Ok(Self::Chaos),
            "logs" => return Ok(Self::Logs),
            "config" => return Ok(Self::Config),
            "context" => return Ok(Self::Context),
            _ => {}
        }

        if let Some(name) = rest.strip_prefix("stateful/") {
            if name.is_empty() {
                return Err(not_found());
            }
            return Ok(Self::Stateful { name: name.into() });
        }
        if let Some(id) = rest.strip_prefix("verification/") {
            if id.is_empty() {
                return Err(not_found());
            }
            return Ok(Self::Verification { id: id.into() });
        }
        if let Some(id) = rest.strip_prefix("grpc/") {
            if id.is_empty() {
                return Err(not_found());
            }
            return Ok(Self::Grpc { id: id.into() });
        }
        if let Some(id) = rest.strip_prefix("mqtt/") {
            if id.is_empty() {
                return Err(not_found());
            }
            return Ok(Self::Mqtt { id: id.into() });
        }
        if let Some(id) = rest.strip_prefix("oauth/") {
            if id.is_empty() {
                return Err(not_found());
            }
            return Ok(Self::OAuth { id: id.into() });
        }
        if let Some(path) = rest.strip_prefix("websocket/") {
            return Ok(Self::WebSocket {
                path: format!("/{path}"),
            });
        }
        if let Some(path) = rest.strip_prefix("graphql/") {
            return Ok(Self::GraphQl {
                path: format!("/{path}"),
            });
        }
        if let Some(path) = rest.strip_prefix("soap/") {
            return Ok(Self::Soap {
                path: format!("/{path}"),
            });
        }

        // HTTP endpoint form: path with a #METHOD fragment
        if let Some((path, method)) = rest.rsplit_once('#') {
            if path.is_empty() || method.is_empty() {
                return Err(not_found());
            }
            let path = if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            };
            return Ok(Self::HttpEndpoint {
                path,
                method: method.to_ascii_uppercase(),
            });
        }

        Err(not_found())
    }
}

impl fmt::Display for MockResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpEndpoint { path, method } => {
                write!(f, "mock://{}#{method}", path.trim_start_matches('/'))
            }
            Self::WebSocket { path } => write!(f, "mock://websocket{path}"),
            Self::GraphQl { path } => write!(f, "mock://graphql{path}"),
            Self::Soap { path } => write!(f, "mock://soap{path}"),
            Self::Grpc { id } => write!(f, "mock://grpc/{id}"),
            Self::Mqtt { id } => write!(f, "mock://mqtt/{id}"),
            Self::OAuth { id } => write!(f, "mock://oauth/{id}"),
            Self::Stateful { name } => write!(f, "mock://stateful/{name}"),
            Self::Chaos => write!(f, "mock://chaos"),
            Self::Verification { id } => write!(f, "mock://verification/{id}"),
            Self::Logs => write!(f, "mock://logs"),
            Self::Config => write!(f, "mock://config"),
            Self::Context => write!(f, "mock://context"),
        }
    }
}

/// Enumerates and reads `mock://` resources through the admin seam.
pub struct ResourceProvider {
    admin: Arc<dyn AdminClient>,
}

impl std::fmt::Debug for ResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceProvider").finish_non_exhaustive()
    }
}

impl ResourceProvider {
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }

    /// Enumerate every discoverable resource.
    pub async fn list(&self) -> McpResult<Vec<Resource>> {
        let mut resources = Vec::new();

        for summary in self.admin.list_mocks().await.map_err(internal)? {
            if let Some(uri) = summary_uri(&summary) {
                resources.push(Resource {
                    uri: uri.to_string(),
                    name: summary
                        .name
                        .clone()
                        .unwrap_or_else(|| summary.id.clone()),
                    description: Some(format!("{} mock", summary.kind.as_str())),
                    mime_type: Some("application/json".into()),
                });
            }
        }

        for name in self.admin.stateful_resources().await.map_err(internal)? {
            resources.push(Resource {
                uri: format!("mock://stateful/{name}"),
                name: name.clone(),
                description: Some("stateful CRUD resource".into()),
                mime_type: Some("application/json".into()),
            });
        }

        for (uri, name, description) in [
            ("mock://chaos", "chaos", "active chaos configuration and stats"),
            ("mock://logs", "logs", "request log summary"),
            ("mock://config", "config", "server configuration snapshot"),
            ("mock://context", "context", "available admin contexts"),
        ] {
            resources.push(Resource {
                uri: uri.into(),
                name: name.into(),
                description: Some(description.into()),
                mime_type: Some("application/json".into()),
            });
        }

        Ok(resources)
    }

    /// Resolve and read one resource.
    pub async fn read(&self, uri: &str) -> McpResult<Vec<ResourceContent>> {
        let parsed = MockResourceUri::parse(uri)?;
        let not_found = || McpError::ResourceNotFound { uri: uri.into() };

        let content = match &parsed {
            MockResourceUri::HttpEndpoint { path, method } => {
                let summaries = self.admin.list_mocks().await.map_err(internal)?;
                let summary = summaries
                    .iter()
                    .find(|s| {
                        s.kind == MockKind::Http
                            && s.path.as_deref() == Some(path.as_str())
                            && s.method
                                .as_deref()
                                .is_some_and(|m| m.eq_ignore_ascii_case(method))
                    })
                    .ok_or_else(not_found)?;
                self.mock_content(uri, &summary.id).await?
            }
            MockResourceUri::WebSocket { path } => {
                self.mock_by_kind_and_path(uri, MockKind::WebSocket, path).await?
            }
            MockResourceUri::GraphQl { path } => {
                self.mock_by_kind_and_path(uri, MockKind::GraphQl, path).await?
            }
            MockResourceUri::Soap { path } => {
                self.mock_by_kind_and_path(uri, MockKind::Soap, path).await?
            }
            MockResourceUri::Grpc { id }
            | MockResourceUri::Mqtt { id }
            | MockResourceUri::OAuth { id } => self.mock_content(uri, id).await?,
            MockResourceUri::Stateful { name } => {
                let value = self
                    .admin
                    .stateful_resource(name)
                    .await
                    .map_err(internal)?
                    .ok_or_else(|| McpError::StatefulNotFound(name.clone()))?;
                ResourceContent::json(uri, &value)
            }
            MockResourceUri::Chaos => {
                ResourceContent::json(uri, &self.admin.chaos_snapshot().await.map_err(internal)?)
            }
            MockResourceUri::Verification { id } => {
                let value = self
                    .admin
                    .verification(id)
                    .await
                    .map_err(internal)?
                    .ok_or_else(|| McpError::MockNotFound(id.clone()))?;
                ResourceContent::json(uri, &value)
            }
            MockResourceUri::Logs => {
                ResourceContent::json(uri, &self.admin.request_log().await.map_err(internal)?)
            }
            MockResourceUri::Config => {
                ResourceContent::json(uri, &self.admin.config_snapshot().await.map_err(internal)?)
            }
            MockResourceUri::Context => {
                ResourceContent::json(uri, &self.admin.contexts().await.map_err(internal)?)
            }
        };

        Ok(vec![content])
    }

    async fn mock_content(&self, uri: &str, id: &str) -> McpResult<ResourceContent> {
        let mock = self
            .admin
            .get_mock(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| McpError::ResourceNotFound { uri: uri.into() })?;
        let value = serde_json::to_value(&mock)
            .unwrap_or_else(|_| json!({"id": mock.id}));
        Ok(ResourceContent::json(uri, &value))
    }

    async fn mock_by_kind_and_path(
        &self,
        uri: &str,
        kind: MockKind,
        path: &str,
    ) -> McpResult<ResourceContent> {
        let summaries = self.admin.list_mocks().await.map_err(internal)?;
        let summary = summaries
            .iter()
            .find(|s| s.kind == kind && s.path.as_deref() == Some(path))
            .ok_or_else(|| McpError::ResourceNotFound { uri: uri.into() })?;
        self.mock_content(uri, &summary.id).await
    }
}

fn summary_uri(summary: &MockSummary) -> Option<MockResourceUri> {
    match summary.kind {
        MockKind::Http => Some(MockResourceUri::HttpEndpoint {
            path: summary.path.clone()?,
            method: summary.method.clone().unwrap_or_else(|| "GET".into()),
        }),
        MockKind::WebSocket => Some(MockResourceUri::WebSocket {
            path: summary.path.clone()?,
        }),
        MockKind::GraphQl => Some(MockResourceUri::GraphQl {
            path: summary.path.clone()?,
        }),
        MockKind::Soap => Some(MockResourceUri::Soap {
            path: summary.path.clone()?,
        }),
        MockKind::Grpc => Some(MockResourceUri::Grpc {
            id: summary.id.clone(),
        }),
        MockKind::Mqtt => Some(MockResourceUri::Mqtt {
            id: summary.id.clone(),
        }),
        MockKind::OAuth => Some(MockResourceUri::OAuth {
            id: summary.id.clone(),
        }),
    }
}

fn internal(error: crate::admin::AdminError) -> McpError {
    McpError::Internal(error.to_string())
}
