//! Tool registry: name → handler table with stable registration order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::admin::AdminError;
use crate::dispatcher::ServerContext;
use crate::session::Session;
use crate::types::{CallToolResult, Tool};

/// Errors a tool handler can produce. These are rendered into the tool
/// result envelope with `isError`, never as JSON-RPC errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The admin backend rejected or could not serve the request.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Failed(String),
}

impl From<AdminError> for ToolError {
    fn from(error: AdminError) -> Self {
        match error {
            AdminError::Unreachable { .. } => Self::Upstream(error.to_string()),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// The single handler signature every tool shares.
pub type ToolHandler = Arc<
    dyn Fn(
            Value,
            Arc<Session>,
            Arc<ServerContext>,
        ) -> BoxFuture<'static, Result<CallToolResult, ToolError>>
        + Send
        + Sync,
>;

struct RegisteredTool {
    definition: Tool,
    handler: ToolHandler,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.definition.name)
            .finish()
    }
}

/// Name-indexed tool table. `definitions` returns tools in registration
/// order, which is the order `tools/list` reports.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Re-registering a name replaces the handler but
    /// keeps the original listing position.
    pub fn register(&mut self, definition: Tool, handler: ToolHandler) {
        match self.index.get(&definition.name) {
            Some(&slot) => {
                self.tools[slot] = RegisteredTool { definition, handler };
            }
            None => {
                self.index.insert(definition.name.clone(), self.tools.len());
                self.tools.push(RegisteredTool { definition, handler });
            }
        }
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn handler(&self, name: &str) -> Option<ToolHandler> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.tools[slot].handler))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Loosely-typed argument extraction. MCP clients send whatever JSON their
/// runtime produced, so numbers arrive as ints or floats and booleans
/// sometimes as strings.
pub mod args {
    use serde_json::Value;

    use super::ToolError;

    pub fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
        optional_str(arguments, key)
            .ok_or_else(|| ToolError::InvalidArgs(format!("missing required argument '{key}'")))
    }

    pub fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
        arguments.get(key).and_then(Value::as_str)
    }

    pub fn optional_bool(arguments: &Value, key: &str) -> Option<bool> {
        match arguments.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Integer coercion across int and float JSON representations.
    pub fn optional_u64(arguments: &Value, key: &str) -> Option<u64> {
        match arguments.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn required_object<'a>(
        arguments: &'a Value,
        key: &str,
    ) -> Result<&'a Value, ToolError> {
        match arguments.get(key) {
            Some(value @ Value::Object(_)) => Ok(value),
            Some(_) => Err(ToolError::InvalidArgs(format!("argument '{key}' must be an object"))),
            None => Err(ToolError::InvalidArgs(format!("missing required argument '{key}'"))),
        }
    }
}
