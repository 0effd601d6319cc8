//! HTTP transport: one endpoint serving POST (JSON-RPC), GET (SSE), and
//! DELETE (session teardown), plus OPTIONS for CORS preflight.
//!
//! Security middleware refuses non-loopback peers unless `allow_remote` is
//! set and validates the Origin header against the configured patterns. A
//! dropped SSE stream releases the session's receiver without expiring the
//! session; the session outlives any single connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::post,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::McpResult;

/// Session id header, set by clients on every non-initialize call and
/// echoed by the server on initialize.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Protocol version response header.
pub const PROTOCOL_HEADER: &str = "MCP-Protocol-Version";

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Build the axum router for the MCP endpoint.
pub fn router(dispatcher: Dispatcher) -> Router {
    let path = dispatcher.context().config.endpoint_path.clone();
    Router::new()
        .route(
            &path,
            post(mcp_post)
                .get(mcp_get)
                .delete(mcp_delete)
                .options(mcp_options),
        )
        .with_state(dispatcher)
}

/// HTTP server wrapper with once-only stop semantics.
#[derive(Debug)]
pub struct HttpServer {
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    stopped: AtomicBool,
}

impl HttpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            shutdown: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Bind and serve until [`stop`](Self::stop) is called.
    pub async fn run(&self) -> McpResult<()> {
        let config = &self.dispatcher.context().config;
        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
        info!(
            addr = %config.bind_addr,
            path = %config.endpoint_path,
            "MCP HTTP transport listening"
        );

        let app = router(self.dispatcher.clone());
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
        .await?;
        Ok(())
    }

    /// Request shutdown. Calling this more than once is a no-op.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.shutdown.cancel();
        }
    }
}

async fn mcp_post(
    State(dispatcher): State<Dispatcher>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(status) = guard(&dispatcher, &headers, addr) {
        return status.into_response();
    }

    let session_id = header_str(&headers, SESSION_HEADER);
    let outcome = dispatcher.handle_text(session_id, &body).await;

    match outcome.response {
        None => StatusCode::ACCEPTED.into_response(),
        Some(response) => {
            let mut response_headers = HeaderMap::new();
            response_headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            if let Some(new_session) = &outcome.session_id
                && let Ok(value) = HeaderValue::from_str(new_session)
            {
                response_headers.insert(SESSION_HEADER, value);
            }
            let body = serde_json::to_string(&response).unwrap_or_else(|_| "{}".into());
            (StatusCode::OK, response_headers, body).into_response()
        }
    }
}

async fn mcp_get(
    State(dispatcher): State<Dispatcher>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    if let Err(status) = guard(&dispatcher, &headers, addr) {
        return status.into_response();
    }

    let accept = header_str(&headers, "accept").unwrap_or_default();
    if !accept.contains("text/event-stream") {
        return StatusCode::NOT_ACCEPTABLE.into_response();
    }

    let Some(session_id) = header_str(&headers, SESSION_HEADER) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(session) = dispatcher.context().sessions.get(session_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let last_event_id = header_str(&headers, "last-event-id").and_then(|v| v.parse::<u64>().ok());
    let replayed = last_event_id
        .map(|id| session.replay_after(id))
        .unwrap_or_default();
    if let Some(last) = last_event_id {
        debug!(session = %session.id(), last, replayed = replayed.len(), "resuming SSE stream");
    }

    let events = session.events();
    let stream = async_stream::stream! {
        for event in replayed {
            yield Ok::<Event, std::convert::Infallible>(
                Event::default()
                    .id(event.id.to_string())
                    .event(event.event)
                    .data(event.data),
            );
        }
        // Holding the receiver lock ties it to this stream; dropping the
        // stream (client disconnect) releases it without expiring the
        // session.
        let mut rx = events.lock_owned().await;
        while let Some(event) = rx.recv().await {
            yield Ok(Event::default()
                .id(event.id.to_string())
                .event(event.event)
                .data(event.data));
        }
    };

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        response_headers.insert(SESSION_HEADER, value);
    }
    response_headers.insert(PROTOCOL_HEADER, HeaderValue::from_static("2025-06-18"));

    (
        response_headers,
        Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE)),
    )
        .into_response()
}

async fn mcp_delete(
    State(dispatcher): State<Dispatcher>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    if let Err(status) = guard(&dispatcher, &headers, addr) {
        return status.into_response();
    }

    let Some(session_id) = header_str(&headers, SESSION_HEADER) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if dispatcher.context().sessions.delete(session_id) {
        debug!(session = session_id, "session terminated by client");
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn mcp_options(
    State(dispatcher): State<Dispatcher>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    if let Err(status) = guard(&dispatcher, &headers, addr) {
        return status.into_response();
    }

    let mut response_headers = HeaderMap::new();
    let origin = header_str(&headers, "origin").unwrap_or("*");
    if let Ok(value) = HeaderValue::from_str(origin) {
        response_headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    response_headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    response_headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Mcp-Session-Id, MCP-Protocol-Version, Last-Event-ID"),
    );
    response_headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Mcp-Session-Id"),
    );

    (StatusCode::OK, response_headers).into_response()
}

/// Shared security checks for every method on the endpoint.
fn guard(
    dispatcher: &Dispatcher,
    headers: &HeaderMap,
    addr: SocketAddr,
) -> Result<(), StatusCode> {
    let config = &dispatcher.context().config;

    if !config.allow_remote && !addr.ip().is_loopback() {
        warn!(peer = %addr, "refusing non-local connection");
        return Err(StatusCode::FORBIDDEN);
    }

    if let Some(origin) = header_str(headers, "origin")
        && !origin_allowed(&config.allowed_origins, origin)
    {
        warn!(origin, "refusing disallowed origin");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(())
}

/// Match an Origin header against the configured patterns: `*`, exact
/// values, or prefix wildcards such as `http://localhost:*`.
pub(crate) fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| {
        if pattern == "*" {
            true
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            origin.starts_with(prefix)
        } else {
            pattern == origin
        }
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_patterns() {
        let patterns = vec![
            "http://localhost:*".to_string(),
            "https://inspector.dev".to_string(),
        ];
        assert!(origin_allowed(&patterns, "http://localhost:6274"));
        assert!(origin_allowed(&patterns, "https://inspector.dev"));
        assert!(!origin_allowed(&patterns, "https://evil.example"));
        assert!(!origin_allowed(&patterns, "http://localhost.evil.example"));

        let any = vec!["*".to_string()];
        assert!(origin_allowed(&any, "https://anywhere.example"));
    }
}
