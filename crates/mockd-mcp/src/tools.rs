//! Built-in tool set: mock CRUD and diagnostics over the admin seam.
//!
//! Every handler shares the `(arguments, session, server) -> result`
//! signature. Failures are reported through the tool-result envelope;
//! list-changing operations broadcast `resources/list_changed` only after
//! the upstream admin call has succeeded.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::jsonrpc::JsonRpcNotification;
use crate::registry::{ToolError, ToolHandler, ToolRegistry, args};
use crate::types::{CallToolResult, Tool, ToolAnnotations};
use mockd_core::{HttpMatcher, Mock};

/// Notification broadcast when the set of mocks (and thus resources)
/// changed. Consumers must treat it as edge-triggered.
pub fn resources_list_changed() -> JsonRpcNotification {
    JsonRpcNotification::new("notifications/resources/list_changed", None)
}

/// Registry with the default mockd tool set, in presentation order.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(
        Tool {
            name: "list_mocks".into(),
            description: "List every registered mock with its protocol, method, and path".into(),
            input_schema: json!({"type": "object", "properties": {}}),
            annotations: Some(ToolAnnotations::read_only()),
        },
        list_mocks_handler(),
    );

    registry.register(
        Tool {
            name: "get_mock".into(),
            description: "Fetch the full definition of one mock by id".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
            }),
            annotations: Some(ToolAnnotations::read_only()),
        },
        get_mock_handler(),
    );

    registry.register(
        Tool {
            name: "create_mock".into(),
            description: "Register a new mock from a declarative definition".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"mock": {"type": "object"}},
                "required": ["mock"],
            }),
            annotations: None,
        },
        create_mock_handler(),
    );

    registry.register(
        Tool {
            name: "update_mock".into(),
            description: "Replace an existing mock definition".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "mock": {"type": "object"},
                },
                "required": ["id", "mock"],
            }),
            annotations: Some(ToolAnnotations::idempotent()),
        },
        update_mock_handler(),
    );

    registry.register(
        Tool {
            name: "delete_mock".into(),
            description: "Delete a mock by id; deleting an unknown id is a no-op".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
            }),
            annotations: Some(ToolAnnotations::destructive()),
        },
        delete_mock_handler(),
    );

    registry.register(
        Tool {
            name: "validate_matcher".into(),
            description: "Validate an HTTP matcher definition without registering it".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"matcher": {"type": "object"}},
                "required": ["matcher"],
            }),
            annotations: Some(ToolAnnotations::read_only()),
        },
        validate_matcher_handler(),
    );

    registry.register(
        Tool {
            name: "get_verification".into(),
            description: "Invocation list and verification state of one mock".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"],
            }),
            annotations: Some(ToolAnnotations::read_only()),
        },
        get_verification_handler(),
    );

    registry.register(
        Tool {
            name: "get_request_log".into(),
            description: "Summary of recently received requests".into(),
            input_schema: json!({"type": "object", "properties": {}}),
            annotations: Some(ToolAnnotations::read_only()),
        },
        request_log_handler(),
    );

    registry
}

fn list_mocks_handler() -> ToolHandler {
    Arc::new(|_args, _session, ctx| {
        Box::pin(async move {
            let summaries = ctx.admin.list_mocks().await?;
            let value = serde_json::to_value(&summaries).unwrap_or_default();
            Ok(CallToolResult::json(&value))
        })
    })
}

fn get_mock_handler() -> ToolHandler {
    Arc::new(|arguments, _session, ctx| {
        Box::pin(async move {
            let id = args::required_str(&arguments, "id")?.to_string();
            match ctx.admin.get_mock(&id).await? {
                Some(mock) => {
                    let value = serde_json::to_value(&mock).unwrap_or_default();
                    Ok(CallToolResult::json(&value))
                }
                None => Err(ToolError::Failed(format!("mock '{id}' not found"))),
            }
        })
    })
}

fn create_mock_handler() -> ToolHandler {
    Arc::new(|arguments, _session, ctx| {
        Box::pin(async move {
            let mock = parse_mock(&arguments)?;
            mock.matcher
                .validate()
                .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

            let created = ctx.admin.create_mock(mock).await?;
            ctx.sessions.broadcast(&resources_list_changed());

            let value = serde_json::to_value(&created).unwrap_or_default();
            Ok(CallToolResult::json(&value))
        })
    })
}

fn update_mock_handler() -> ToolHandler {
    Arc::new(|arguments, _session, ctx| {
        Box::pin(async move {
            let id = args::required_str(&arguments, "id")?.to_string();
            let mock = parse_mock(&arguments)?;
            mock.matcher
                .validate()
                .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

            let updated = ctx.admin.update_mock(&id, mock).await?;
            ctx.sessions.broadcast(&resources_list_changed());

            let value = serde_json::to_value(&updated).unwrap_or_default();
            Ok(CallToolResult::json(&value))
        })
    })
}

fn delete_mock_handler() -> ToolHandler {
    Arc::new(|arguments, _session, ctx| {
        Box::pin(async move {
            let id = args::required_str(&arguments, "id")?.to_string();
            ctx.admin.delete_mock(&id).await?;
            ctx.sessions.broadcast(&resources_list_changed());
            Ok(CallToolResult::text(format!("mock '{id}' deleted")))
        })
    })
}

fn validate_matcher_handler() -> ToolHandler {
    Arc::new(|arguments, _session, _ctx| {
        Box::pin(async move {
            let raw = args::required_object(&arguments, "matcher")?;
            let matcher: HttpMatcher = serde_json::from_value(raw.clone())
                .map_err(|e| ToolError::InvalidArgs(format!("malformed matcher: {e}")))?;

            match matcher.validate() {
                Ok(()) => Ok(CallToolResult::text("matcher is valid")),
                Err(e) => Ok(CallToolResult::text(format!("matcher is invalid: {e}"))),
            }
        })
    })
}

fn get_verification_handler() -> ToolHandler {
    Arc::new(|arguments, _session, ctx| {
        Box::pin(async move {
            let id = args::required_str(&arguments, "id")?.to_string();
            match ctx.admin.verification(&id).await? {
                Some(value) => Ok(CallToolResult::json(&value)),
                None => Err(ToolError::Failed(format!("mock '{id}' not found"))),
            }
        })
    })
}

fn request_log_handler() -> ToolHandler {
    Arc::new(|_args, _session, ctx| {
        Box::pin(async move {
            let value = ctx.admin.request_log().await?;
            Ok(CallToolResult::json(&value))
        })
    })
}

fn parse_mock(arguments: &Value) -> Result<Mock, ToolError> {
    let raw = args::required_object(arguments, "mock")?;
    serde_json::from_value(raw.clone())
        .map_err(|e| ToolError::InvalidArgs(format!("malformed mock definition: {e}")))
}
