//! # mockd-mcp
//!
//! Model Context Protocol front-end for mockd.
//!
//! Exposes the mock server's capabilities to AI agents over JSON-RPC 2.0:
//! a session manager with bounded per-session event queues, a tool registry
//! driving mock CRUD through the admin API, a `mock://` resource space, and
//! two transports (HTTP with SSE streaming, and newline-delimited stdio)
//! sharing one dispatcher.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mockd_mcp::{
//!     Dispatcher, HttpAdminClient, McpServerConfig, ServerContext, SessionManager,
//!     default_registry, transport,
//! };
//!
//! # async fn serve() -> mockd_mcp::McpResult<()> {
//! let config = McpServerConfig::default();
//! let admin = Arc::new(HttpAdminClient::new(&config.admin_url).unwrap());
//! let sessions = SessionManager::new(config.max_sessions, config.session_timeout);
//! let registry = Arc::new(default_registry());
//! let ctx = ServerContext::new(config, sessions, registry, admin);
//! let server = transport::http::HttpServer::new(Dispatcher::new(ctx));
//! server.run().await
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms, clippy::all)]
#![forbid(unsafe_code)]

pub mod admin;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod jsonrpc;
pub mod registry;
pub mod resources;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use admin::{AdminClient, AdminError, AdminResult, HttpAdminClient, MockSummary};
pub use config::{McpServerConfig, McpServerConfigBuilder};
pub use dispatcher::{DispatchOutcome, Dispatcher, ServerContext};
pub use error::{McpError, McpResult};
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    RequestId, codes,
};
pub use registry::{ToolError, ToolHandler, ToolRegistry};
pub use resources::{MockResourceUri, ResourceProvider};
pub use session::{Session, SessionContext, SessionManager, SessionState, StoredEvent};
pub use tools::{default_registry, resources_list_changed};
pub use types::{PROTOCOL_VERSION, SUPPORTED_VERSIONS};
