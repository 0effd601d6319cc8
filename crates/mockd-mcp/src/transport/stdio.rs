//! stdio transport: newline-delimited JSON over stdin/stdout.
//!
//! One implicit session handles all traffic; the session is created by the
//! usual `initialize` handshake and torn down when stdin reaches EOF.
//! Responses are written as single lines to stdout and notifications
//! produce no output. Anything that logs must go to stderr: callers are
//! expected to configure their tracing subscriber with a stderr writer so
//! stdout stays a clean protocol channel.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{McpError, McpResult};
use crate::session::Session;

/// Maximum accepted line length: large mock definitions fit comfortably.
pub const MAX_LINE_LENGTH: usize = 10 * 1024 * 1024;

type SharedWriter<W> = Arc<Mutex<FramedWrite<W, LinesCodec>>>;

/// Run the stdio transport over the current process's stdin/stdout until
/// EOF.
pub async fn run(dispatcher: Dispatcher) -> McpResult<()> {
    run_with(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Run the stdio loop over arbitrary streams (tests use in-memory pipes).
pub async fn run_with<R, W>(dispatcher: Dispatcher, input: R, output: W) -> McpResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = FramedRead::new(input, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let writer: SharedWriter<W> = Arc::new(Mutex::new(FramedWrite::new(
        output,
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    )));

    let mut session_id: Option<String> = None;
    let mut pump: Option<JoinHandle<()>> = None;

    while let Some(item) = reader.next().await {
        let line = match item {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("dropping oversized stdio frame");
                continue;
            }
            Err(LinesCodecError::Io(e)) => return Err(McpError::Io(e)),
        };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = dispatcher.handle_text(session_id.as_deref(), &line).await;

        if let Some(id) = &outcome.session_id {
            session_id = Some(id.clone());
            if let Some(session) = dispatcher.context().sessions.get(id) {
                if let Some(previous) = pump.take() {
                    previous.abort();
                }
                pump = Some(spawn_notification_pump(session, Arc::clone(&writer)));
            }
        }

        if let Some(response) = outcome.response {
            let text =
                serde_json::to_string(&response).map_err(|e| McpError::Internal(e.to_string()))?;
            write_line(&writer, text).await?;
        }
    }

    // stdin EOF: tear the implicit session down and exit cleanly
    debug!("stdio transport reached EOF");
    if let Some(handle) = pump.take() {
        handle.abort();
    }
    if let Some(id) = session_id {
        dispatcher.context().sessions.delete(&id);
    }
    Ok(())
}

/// Forward queued session notifications to stdout as single lines.
fn spawn_notification_pump<W>(session: Arc<Session>, writer: SharedWriter<W>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut rx = session.events().lock_owned().await;
        while let Some(event) = rx.recv().await {
            if write_line(&writer, event.data).await.is_err() {
                break;
            }
        }
    })
}

async fn write_line<W>(writer: &SharedWriter<W>, line: String) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.lock().await.send(line).await.map_err(|e| match e {
        LinesCodecError::Io(io) => McpError::Io(io),
        LinesCodecError::MaxLineLengthExceeded => {
            McpError::Internal("response exceeded maximum line length".into())
        }
    })
}
