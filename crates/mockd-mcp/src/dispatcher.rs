//! JSON-RPC method router with session lifecycle gating.
//!
//! The dispatcher is the single entry point for parsed JSON-RPC traffic
//! from both transports. It resolves the session named by the transport
//! header, enforces the lifecycle (`initialize` → `initialized` → ready
//! methods), and routes to the tool registry and resource provider.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::admin::AdminClient;
use crate::config::McpServerConfig;
use crate::error::{McpError, McpResult};
use crate::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::registry::ToolRegistry;
use crate::resources::ResourceProvider;
use crate::session::{Session, SessionContext, SessionManager, SessionState};
use crate::types::{
    CallToolRequest, CallToolResult, Implementation, InitializeRequest, InitializeResult,
    ListResourcesResult, ListToolsResult, ReadResourceResult, ServerCapabilities,
    SubscribeRequest, PROTOCOL_VERSION, SUPPORTED_VERSIONS,
};

/// Shared server state handed to every tool handler.
pub struct ServerContext {
    pub config: McpServerConfig,
    pub sessions: Arc<SessionManager>,
    pub registry: Arc<ToolRegistry>,
    pub resources: Arc<ResourceProvider>,
    pub admin: Arc<dyn AdminClient>,
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .field("tools", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl ServerContext {
    pub fn new(
        config: McpServerConfig,
        sessions: Arc<SessionManager>,
        registry: Arc<ToolRegistry>,
        admin: Arc<dyn AdminClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            resources: Arc::new(ResourceProvider::new(Arc::clone(&admin))),
            config,
            sessions,
            registry,
            admin,
        })
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            name: self.config.context_name.clone(),
            admin_url: self.config.admin_url.clone(),
            workspace: self.config.workspace.clone(),
        }
    }
}

/// What the transport should do with a handled message.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Response to write back, absent for notifications.
    pub response: Option<JsonRpcResponse>,
    /// Session created by this message (`initialize` only); HTTP echoes it
    /// as `Mcp-Session-Id`.
    pub session_id: Option<String>,
}

/// Routes parsed JSON-RPC messages. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    ctx: Arc<ServerContext>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Handle one raw line/body. Parse failures become `-32700` responses
    /// with a null id; the server never crashes on malformed input.
    pub async fn handle_text(&self, session_header: Option<&str>, raw: &str) -> DispatchOutcome {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(session_header, value).await,
            Err(e) => DispatchOutcome {
                response: Some(JsonRpcResponse::error(
                    None,
                    McpError::Parse(e.to_string()).to_json_rpc(),
                )),
                session_id: None,
            },
        }
    }

    /// Handle one decoded JSON value.
    pub async fn handle_value(&self, session_header: Option<&str>, value: Value) -> DispatchOutcome {
        match serde_json::from_value::<JsonRpcMessage>(value) {
            Ok(JsonRpcMessage::Request(request)) => {
                self.handle_request(session_header, request).await
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                self.handle_notification(session_header, &notification);
                DispatchOutcome::default()
            }
            // responses to server-initiated requests are not used here
            Ok(JsonRpcMessage::Response(_)) => DispatchOutcome::default(),
            Err(e) => DispatchOutcome {
                response: Some(JsonRpcResponse::error(
                    None,
                    McpError::InvalidRequest(e.to_string()).to_json_rpc(),
                )),
                session_id: None,
            },
        }
    }

    async fn handle_request(
        &self,
        session_header: Option<&str>,
        request: JsonRpcRequest,
    ) -> DispatchOutcome {
        let id = request.id.clone();

        if request.method == "initialize" {
            return match self.handle_initialize(&request).await {
                Ok((result, session_id)) => DispatchOutcome {
                    response: Some(JsonRpcResponse::success(
                        id,
                        serde_json::to_value(result).unwrap_or_default(),
                    )),
                    session_id: Some(session_id),
                },
                Err(e) => DispatchOutcome {
                    response: Some(JsonRpcResponse::error(Some(id), e.to_json_rpc())),
                    session_id: None,
                },
            };
        }

        let outcome = async {
            let session = self.resolve_session(session_header)?;
            session.touch();
            self.route(&session, &request).await
        }
        .await;

        DispatchOutcome {
            response: Some(match outcome {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(Some(id), e.to_json_rpc()),
            }),
            session_id: None,
        }
    }

    async fn handle_initialize(
        &self,
        request: &JsonRpcRequest,
    ) -> McpResult<(InitializeResult, String)> {
        let params: InitializeRequest = parse_params(request)?;

        if params.protocol_version.is_empty() {
            return Err(McpError::ProtocolVersion("(empty)".into()));
        }

        // A known version is echoed; anything else is answered with the
        // newest version this server speaks and the client decides.
        let negotiated = if SUPPORTED_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version.clone()
        } else {
            debug!(
                requested = %params.protocol_version,
                offered = PROTOCOL_VERSION,
                "unsupported protocol version, offering fallback"
            );
            PROTOCOL_VERSION.to_string()
        };

        let session = self.ctx.sessions.create(self.ctx.session_context())?;
        session.set_initialized(
            negotiated.clone(),
            params.client_info.clone(),
            params.capabilities.clone(),
        )?;

        debug!(session = %session.id(), client = %params.client_info.name, "session initialized");

        Ok((
            InitializeResult {
                protocol_version: negotiated,
                capabilities: ServerCapabilities::advertised(),
                server_info: Implementation {
                    name: self.ctx.config.server_name.clone(),
                    version: self.ctx.config.server_version.clone(),
                    title: None,
                },
                instructions: None,
            },
            session.id().to_string(),
        ))
    }

    fn resolve_session(&self, session_header: Option<&str>) -> McpResult<Arc<Session>> {
        let id = session_header.ok_or(McpError::SessionRequired)?;
        match self.ctx.sessions.get(id) {
            Some(session) if session.state() != SessionState::Expired => Ok(session),
            _ => Err(McpError::SessionExpired(id.to_string())),
        }
    }

    fn require_ready(session: &Session) -> McpResult<()> {
        match session.state() {
            SessionState::Ready => Ok(()),
            _ => Err(McpError::NotInitialized),
        }
    }

    async fn route(&self, session: &Arc<Session>, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "ping" => Ok(json!({})),

            "tools/list" => {
                Self::require_ready(session)?;
                let result = ListToolsResult {
                    tools: self.ctx.registry.definitions(),
                };
                Ok(serde_json::to_value(result).unwrap_or_default())
            }

            "tools/call" => {
                Self::require_ready(session)?;
                let params: CallToolRequest = parse_params(request)?;
                let result = self.call_tool(session, params).await?;
                Ok(serde_json::to_value(result).unwrap_or_default())
            }

            "resources/list" => {
                Self::require_ready(session)?;
                let result = ListResourcesResult {
                    resources: self.ctx.resources.list().await?,
                };
                Ok(serde_json::to_value(result).unwrap_or_default())
            }

            "resources/read" => {
                Self::require_ready(session)?;
                let params: SubscribeRequest = parse_params(request)?;
                let result = ReadResourceResult {
                    contents: self.ctx.resources.read(&params.uri).await?,
                };
                Ok(serde_json::to_value(result).unwrap_or_default())
            }

            "resources/subscribe" => {
                Self::require_ready(session)?;
                let params: SubscribeRequest = parse_params(request)?;
                session.subscribe(params.uri);
                Ok(json!({}))
            }

            "resources/unsubscribe" => {
                Self::require_ready(session)?;
                let params: SubscribeRequest = parse_params(request)?;
                session.unsubscribe(&params.uri);
                Ok(json!({}))
            }

            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    async fn call_tool(
        &self,
        session: &Arc<Session>,
        params: CallToolRequest,
    ) -> McpResult<CallToolResult> {
        let handler = self
            .ctx
            .registry
            .handler(&params.name)
            .ok_or_else(|| McpError::Tool(format!("unknown tool '{}'", params.name)))?;

        // Tool failures, bad arguments included, stay inside the result
        // envelope with isError set; they are never JSON-RPC errors.
        match handler(params.arguments, Arc::clone(session), Arc::clone(&self.ctx)).await {
            Ok(result) => Ok(result),
            Err(error) => {
                debug!(tool = %params.name, error = %error, "tool call failed");
                Ok(CallToolResult::error(error.to_string()))
            }
        }
    }

    fn handle_notification(
        &self,
        session_header: Option<&str>,
        notification: &JsonRpcNotification,
    ) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                let Ok(session) = self.resolve_session(session_header) else {
                    warn!("initialized notification without a live session");
                    return;
                };
                if let Err(e) = session.mark_ready() {
                    warn!(session = %session.id(), error = %e, "unexpected initialized notification");
                } else {
                    debug!(session = %session.id(), "session ready");
                }
            }
            other => {
                debug!(method = other, "ignoring notification");
            }
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(request: &JsonRpcRequest) -> McpResult<T> {
    let params = request.params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
}
