//! HTTP transport behavior: session header echo, security middleware,
//! CORS preflight, and session teardown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use mockd_core::Mock;
use mockd_mcp::admin::{AdminClient, AdminResult, MockSummary};
use mockd_mcp::transport::http::router;
use mockd_mcp::{
    Dispatcher, McpServerConfig, ServerContext, SessionManager, default_registry,
};

/// Admin stub for transport tests; nothing here touches mock storage.
struct EmptyAdmin;

#[async_trait]
impl AdminClient for EmptyAdmin {
    async fn list_mocks(&self) -> AdminResult<Vec<MockSummary>> {
        Ok(Vec::new())
    }
    async fn get_mock(&self, _id: &str) -> AdminResult<Option<Mock>> {
        Ok(None)
    }
    async fn create_mock(&self, mock: Mock) -> AdminResult<Mock> {
        Ok(mock)
    }
    async fn update_mock(&self, _id: &str, mock: Mock) -> AdminResult<Mock> {
        Ok(mock)
    }
    async fn delete_mock(&self, _id: &str) -> AdminResult<()> {
        Ok(())
    }
    async fn stateful_resources(&self) -> AdminResult<Vec<String>> {
        Ok(Vec::new())
    }
    async fn stateful_resource(&self, _name: &str) -> AdminResult<Option<Value>> {
        Ok(None)
    }
    async fn chaos_snapshot(&self) -> AdminResult<Value> {
        Ok(json!({}))
    }
    async fn verification(&self, _id: &str) -> AdminResult<Option<Value>> {
        Ok(None)
    }
    async fn request_log(&self) -> AdminResult<Value> {
        Ok(json!({}))
    }
    async fn config_snapshot(&self) -> AdminResult<Value> {
        Ok(json!({}))
    }
    async fn contexts(&self) -> AdminResult<Value> {
        Ok(json!([]))
    }
}

fn app_from(config: McpServerConfig, peer: SocketAddr) -> Router {
    let sessions = SessionManager::new(config.max_sessions, Duration::from_secs(1800));
    let registry = Arc::new(default_registry());
    let ctx = ServerContext::new(config, sessions, registry, Arc::new(EmptyAdmin));
    router(Dispatcher::new(ctx)).layer(MockConnectInfo(peer))
}

fn local_app() -> Router {
    app_from(McpServerConfig::default(), ([127, 0, 0, 1], 50000).into())
}

fn initialize_body() -> Body {
    Body::from(
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": {"name": "inspector", "version": "1.0"},
            },
        })
        .to_string(),
    )
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn initialize_echoes_session_id_header() {
    let app = local_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response
        .headers()
        .get("Mcp-Session-Id")
        .expect("initialize must echo a session id")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(session_id.len(), 32);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["result"]["protocolVersion"], "2025-06-18");
}

#[tokio::test]
async fn non_local_peers_are_refused_unless_allowed() {
    let remote_peer: SocketAddr = ([203, 0, 113, 9], 40000).into();

    let app = app_from(McpServerConfig::default(), remote_peer);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let permissive = McpServerConfig::builder().allow_remote(true).build();
    let app = app_from(permissive, remote_peer);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn disallowed_origin_is_forbidden() {
    let app = local_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header(header::ORIGIN, "https://evil.example")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = local_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header(header::ORIGIN, "http://localhost:6274")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn preflight_exposes_session_header() {
    let app = local_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/mcp")
                .header(header::ORIGIN, "http://localhost:6274")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expose = response
        .headers()
        .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(expose.contains("Mcp-Session-Id"));
}

#[tokio::test]
async fn sse_requires_accept_and_session() {
    let app = local_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/mcp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let app = local_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/mcp")
                .header(header::ACCEPT, "text/event-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_terminates_the_session_once() {
    // one app instance so all calls share the session table
    let app = local_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();
    let session_id = response
        .headers()
        .get("Mcp-Session-Id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let delete = |id: String| {
        Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header("Mcp-Session-Id", id)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete(session_id.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clone().oneshot(delete(session_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sse_stream_opens_for_a_live_session() {
    let app = local_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .body(initialize_body())
                .unwrap(),
        )
        .await
        .unwrap();
    let session_id = response
        .headers()
        .get("Mcp-Session-Id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/mcp")
                .header(header::ACCEPT, "text/event-stream")
                .header("Mcp-Session-Id", &session_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(
        response.headers().get("Mcp-Session-Id").unwrap().to_str().unwrap(),
        session_id
    );
    // dropping the response releases the stream without expiring the session
}
