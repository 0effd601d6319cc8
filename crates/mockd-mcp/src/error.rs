//! MCP server error type and its JSON-RPC mapping.

use serde_json::{Value, json};
use thiserror::Error;

use crate::jsonrpc::{JsonRpcError, codes};

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors surfaced by the MCP runtime. Every variant maps to a JSON-RPC
/// error code; session-state violations are protocol errors, never 5xx.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum McpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("mock not found: {0}")]
    MockNotFound(String),

    #[error("invalid mock: {0}")]
    InvalidMock(String),

    #[error("resource not found: {uri}")]
    ResourceNotFound { uri: String },

    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("session required")]
    SessionRequired,

    #[error("session not initialized")]
    NotInitialized,

    #[error("stateful resource not found: {0}")]
    StatefulNotFound(String),

    #[error("unsupported protocol version: {0}")]
    ProtocolVersion(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => codes::PARSE_ERROR,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::Internal(_) | Self::Io(_) => codes::INTERNAL_ERROR,
            Self::MockNotFound(_) => codes::MOCK_NOT_FOUND,
            Self::InvalidMock(_) => codes::INVALID_MOCK,
            Self::ResourceNotFound { .. } => codes::RESOURCE_NOT_FOUND,
            Self::SessionExpired(_) => codes::SESSION_EXPIRED,
            Self::Tool(_) => codes::TOOL_ERROR,
            Self::SessionRequired => codes::SESSION_REQUIRED,
            Self::NotInitialized => codes::NOT_INITIALIZED,
            Self::StatefulNotFound(_) => codes::STATEFUL_NOT_FOUND,
            Self::ProtocolVersion(_) => codes::PROTOCOL_VERSION,
        }
    }

    /// Structured `data` payload attached to the wire error, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::ResourceNotFound { uri } => Some(json!({"uri": uri})),
            Self::SessionExpired(id) => Some(json!({"sessionId": id})),
            Self::ProtocolVersion(requested) => Some(json!({
                "requested": requested,
                "supported": crate::types::SUPPORTED_VERSIONS,
            })),
            _ => None,
        }
    }

    /// Render as a JSON-RPC error object.
    pub fn to_json_rpc(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: self.data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_contract() {
        assert_eq!(McpError::SessionRequired.code(), -32006);
        assert_eq!(McpError::NotInitialized.code(), -32007);
        assert_eq!(McpError::SessionExpired("x".into()).code(), -32004);
        assert_eq!(McpError::ProtocolVersion("1999".into()).code(), -32009);
        assert_eq!(McpError::Parse("bad".into()).code(), -32700);
    }

    #[test]
    fn resource_not_found_carries_uri_data() {
        let err = McpError::ResourceNotFound {
            uri: "mock://nope".into(),
        };
        assert_eq!(err.data().unwrap()["uri"], "mock://nope");
    }
}
