//! MCP server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the MCP runtime and its HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpServerConfig {
    /// Bind address for the HTTP transport.
    pub bind_addr: String,
    /// Endpoint path serving POST/GET/DELETE.
    pub endpoint_path: String,
    /// Accept connections from non-loopback addresses.
    pub allow_remote: bool,
    /// Allowed Origin patterns: `*`, exact values, or prefix wildcards
    /// such as `http://localhost:*`.
    pub allowed_origins: Vec<String>,
    /// Maximum concurrent sessions.
    pub max_sessions: usize,
    /// Idle timeout before a session is swept.
    #[serde(with = "duration_secs")]
    pub session_timeout: Duration,
    /// Admin API base URL the tools operate against.
    pub admin_url: String,
    /// Context name reported to clients.
    pub context_name: String,
    /// Workspace scope, if any.
    pub workspace: Option<String>,
    pub server_name: String,
    pub server_version: String,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4200".into(),
            endpoint_path: "/mcp".into(),
            allow_remote: false,
            allowed_origins: vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()],
            max_sessions: 64,
            session_timeout: Duration::from_secs(30 * 60),
            admin_url: "http://localhost:4100".into(),
            context_name: "default".into(),
            workspace: None,
            server_name: "mockd".into(),
            server_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl McpServerConfig {
    pub fn builder() -> McpServerConfigBuilder {
        McpServerConfigBuilder::new()
    }
}

/// Builder for [`McpServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct McpServerConfigBuilder {
    config: McpServerConfig,
}

impl McpServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: McpServerConfig::default(),
        }
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.config.endpoint_path = path.into();
        self
    }

    pub fn allow_remote(mut self, allow: bool) -> Self {
        self.config.allow_remote = allow;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.allowed_origins = origins;
        self
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.config.max_sessions = max;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout = timeout;
        self
    }

    pub fn with_admin_url(mut self, url: impl Into<String>) -> Self {
        self.config.admin_url = url.into();
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.config.workspace = Some(workspace.into());
        self
    }

    pub fn build(self) -> McpServerConfig {
        self.config
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
