//! Runtime client flow against a stub control plane.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

use mockd_core::MockdUri;
use mockd_runtime::{DeploymentCache, RuntimeClient, RuntimeConfig};

#[derive(Clone, Default)]
struct PlaneState {
    first_heartbeat_done: Arc<AtomicBool>,
}

async fn start_stub_plane() -> String {
    let state = PlaneState::default();

    let app = Router::new()
        .route(
            "/api/v1/runtimes/register",
            post(|Json(body): Json<Value>| async move {
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "id": "rt-1",
                        "token": "rotated-token",
                        "name": body["name"],
                        "url": body["url"],
                        "labels": body["labels"],
                        "status": "active",
                        "createdAt": "2026-08-01T00:00:00Z",
                    })),
                )
            }),
        )
        .route(
            "/api/v1/runtimes/{id}/heartbeat",
            post({
                let state = state.clone();
                move |_body: String| async move {
                    // first heartbeat delivers commands, later ones are empty
                    if state.first_heartbeat_done.swap(true, Ordering::SeqCst) {
                        return Json(json!({"commands": []}));
                    }
                    Json(json!({
                        "commands": [
                            {
                                "type": "deploy",
                                "deploymentId": "d1",
                                "mockId": "m1",
                                "mockVersion": "v1.0.0",
                                "urlPath": "/x",
                                "content": {"status": 200},
                            },
                            {
                                "type": "deploy",
                                "deploymentId": "d2",
                                "mockId": "m2",
                                "mockVersion": "v2.0.0",
                                "urlPath": "/x",
                                "content": {"status": 201},
                            },
                            {"type": "undeploy", "deploymentId": "ghost"},
                        ]
                    }))
                }
            }),
        )
        .route(
            "/api/v1/runtimes/{id}/deployments",
            get(|| async {
                Json(json!({
                    "deployments": [
                        {"id": "p1", "mockId": "m9", "version": "v3.0.0", "urlPath": "/pulled", "content": {}},
                    ]
                }))
            }),
        )
        .route(
            "/api/v1/pull",
            get(|Query(params): Query<Vec<(String, String)>>| async move {
                let uri = params
                    .iter()
                    .find(|(k, _)| k == "uri")
                    .map(|(_, v)| v.as_str())
                    .unwrap_or_default();
                if uri == "mockd://acme/payments@v1.2.0" {
                    Json(json!({
                        "collection": "payments",
                        "version": "v1.2.0",
                        "content": {"mocks": []},
                    }))
                    .into_response()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(url: String) -> RuntimeConfig {
    RuntimeConfig {
        control_plane_url: url,
        name: "edge-1".into(),
        advertise_url: "http://localhost:4000".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn register_heartbeat_and_apply_commands() {
    let url = start_stub_plane().await;
    let dir = tempfile::tempdir().unwrap();
    let cache = DeploymentCache::open(dir.path()).unwrap();
    let client = RuntimeClient::new(config(url), Some(cache)).unwrap();

    let registered = client.register().await.unwrap();
    assert_eq!(registered.id, "rt-1");
    assert_eq!(registered.token.as_deref(), Some("rotated-token"));
    assert_eq!(client.runtime_id().as_deref(), Some("rt-1"));

    // first heartbeat: d1 then d2 contend for /x, d2 wins; ghost undeploy
    // is a no-op
    let commands = client.heartbeat().await.unwrap();
    assert_eq!(commands, 3);

    let index = client.index();
    assert_eq!(index.len(), 1);
    assert_eq!(index.by_path("/x").unwrap().id, "d2");
    assert!(index.by_id("d1").is_none());

    // second heartbeat reports the active deployment and gets no commands
    let commands = client.heartbeat().await.unwrap();
    assert_eq!(commands, 0);

    // the winning deployment survived to disk, the evicted one did not
    let cache = DeploymentCache::open(dir.path()).unwrap();
    let cached = cache.load_all().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, "d2");
}

#[tokio::test]
async fn pull_replaces_the_index() {
    let url = start_stub_plane().await;
    let client = RuntimeClient::new(config(url), None).unwrap();
    client.register().await.unwrap();
    client.heartbeat().await.unwrap();

    let count = client.pull_deployments().await.unwrap();
    assert_eq!(count, 1);

    let index = client.index();
    assert!(index.by_path("/x").is_none());
    assert_eq!(index.by_path("/pulled").unwrap().id, "p1");
}

#[tokio::test]
async fn pull_by_uri_distinguishes_found_and_missing() {
    let url = start_stub_plane().await;
    let client = RuntimeClient::new(config(url), None).unwrap();

    let uri = MockdUri::parse("mockd://acme/payments@v1.2.0").unwrap();
    let pulled = client.pull_by_uri(&uri).await.unwrap().unwrap();
    assert_eq!(pulled.collection, "payments");
    assert_eq!(pulled.version, "v1.2.0");

    let missing = MockdUri::parse("mockd://acme/other").unwrap();
    assert!(client.pull_by_uri(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn offline_start_restores_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = DeploymentCache::open(dir.path()).unwrap();
        cache
            .store(&mockd_core::Deployment::new(
                "d1",
                "m1",
                "v1.0.0",
                "/cached",
                json!({}),
            ))
            .unwrap();
    }

    // control plane is unreachable; the cache still populates the index
    let cache = DeploymentCache::open(dir.path()).unwrap();
    let client = RuntimeClient::new(
        config("http://127.0.0.1:1".into()),
        Some(cache),
    )
    .unwrap();

    let restored = client.load_cache().unwrap();
    assert_eq!(restored, 1);
    assert_eq!(client.index().by_path("/cached").unwrap().id, "d1");

    let err = client.register().await.unwrap_err();
    assert!(matches!(err, mockd_runtime::RuntimeError::Unreachable { .. }));
}
