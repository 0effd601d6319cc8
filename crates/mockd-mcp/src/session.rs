//! MCP session lifecycle and the session manager.
//!
//! Sessions move forward only: `New → Initialized → Ready → Expired`. Each
//! session owns a bounded outbound event queue; producers never block and
//! accept loss when the queue is full. The sender half is dropped exactly
//! once, on the transition to `Expired`, which is how readers observe
//! closure.
//!
//! Lock ordering: the manager's table lock is always taken before any
//! session's field lock, and event sends happen without holding either.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{McpError, McpResult};
use crate::jsonrpc::JsonRpcNotification;
use crate::types::Implementation;

/// Outbound event queue depth per session.
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// How often the periodic sweeper removes idle sessions.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// SSE replay buffer depth per session.
const REPLAY_BUFFER: usize = 100;

/// Session lifecycle states. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    New,
    Initialized,
    Ready,
    Expired,
}

/// Deployment context a session operates in.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub name: String,
    pub admin_url: String,
    pub workspace: Option<String>,
}

/// An event queued for delivery over SSE or stdio, with its monotonic id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub id: u64,
    pub event: String,
    pub data: String,
}

#[derive(Debug)]
struct SessionFields {
    state: SessionState,
    protocol_version: Option<String>,
    client_info: Option<Implementation>,
    capabilities: Option<serde_json::Value>,
    subscriptions: HashSet<String>,
    last_active: Instant,
}

/// One MCP client session.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    context: SessionContext,
    fields: RwLock<SessionFields>,
    /// Sender half; taken exactly once when the session expires.
    events_tx: Mutex<Option<mpsc::Sender<StoredEvent>>>,
    /// Receiver half; a transport holds the lock for the lifetime of one
    /// stream, so the session outlives any individual connection.
    events_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<StoredEvent>>>,
    replay: Mutex<VecDeque<StoredEvent>>,
    next_event_id: AtomicU64,
}

impl Session {
    fn new(context: SessionContext) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Arc::new(Self {
            id: generate_session_id(),
            created_at: Utc::now(),
            context,
            fields: RwLock::new(SessionFields {
                state: SessionState::New,
                protocol_version: None,
                client_info: None,
                capabilities: None,
                subscriptions: HashSet::new(),
                last_active: Instant::now(),
            }),
            events_tx: Mutex::new(Some(tx)),
            events_rx: Arc::new(tokio::sync::Mutex::new(rx)),
            replay: Mutex::new(VecDeque::with_capacity(REPLAY_BUFFER)),
            next_event_id: AtomicU64::new(1),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn state(&self) -> SessionState {
        self.fields.read().state
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.fields.read().protocol_version.clone()
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.fields.read().client_info.clone()
    }

    /// Record the initialize handshake. `New → Initialized`.
    pub fn set_initialized(
        &self,
        protocol_version: String,
        client_info: Implementation,
        capabilities: serde_json::Value,
    ) -> McpResult<()> {
        let mut fields = self.fields.write();
        if fields.state != SessionState::New {
            return Err(McpError::InvalidRequest(format!(
                "session {} already initialized",
                self.id
            )));
        }
        fields.state = SessionState::Initialized;
        fields.protocol_version = Some(protocol_version);
        fields.client_info = Some(client_info);
        fields.capabilities = Some(capabilities);
        fields.last_active = Instant::now();
        Ok(())
    }

    /// The client confirmed initialization. `Initialized → Ready`.
    pub fn mark_ready(&self) -> McpResult<()> {
        let mut fields = self.fields.write();
        match fields.state {
            SessionState::Initialized => {
                fields.state = SessionState::Ready;
                fields.last_active = Instant::now();
                Ok(())
            }
            SessionState::Ready => Ok(()),
            _ => Err(McpError::NotInitialized),
        }
    }

    pub fn touch(&self) {
        self.fields.write().last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.fields.read().last_active.elapsed()
    }

    pub fn subscribe(&self, uri: impl Into<String>) {
        self.fields.write().subscriptions.insert(uri.into());
    }

    pub fn unsubscribe(&self, uri: &str) {
        self.fields.write().subscriptions.remove(uri);
    }

    pub fn is_subscribed(&self, uri: &str) -> bool {
        self.fields.read().subscriptions.contains(uri)
    }

    /// Non-blocking enqueue of a notification. Returns whether the event
    /// was accepted; a full queue or an expired session drops it.
    pub fn send_notification(&self, notification: &JsonRpcNotification) -> bool {
        let data = match serde_json::to_string(notification) {
            Ok(data) => data,
            Err(e) => {
                warn!(session = %self.id, error = %e, "failed to encode notification");
                return false;
            }
        };

        let event = StoredEvent {
            id: self.next_event_id.fetch_add(1, Ordering::Relaxed),
            event: "message".into(),
            data,
        };

        {
            let mut replay = self.replay.lock();
            if replay.len() == REPLAY_BUFFER {
                replay.pop_front();
            }
            replay.push_back(event.clone());
        }

        let sender = self.events_tx.lock().clone();
        match sender {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(session = %self.id, "event queue full, dropping notification");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            },
            None => false,
        }
    }

    /// Events with an id greater than `last_id`, for SSE resumption.
    pub fn replay_after(&self, last_id: u64) -> Vec<StoredEvent> {
        self.replay
            .lock()
            .iter()
            .filter(|e| e.id > last_id)
            .cloned()
            .collect()
    }

    /// Shared handle to the receiver; transports lock it for the duration
    /// of one stream.
    pub fn events(&self) -> Arc<tokio::sync::Mutex<mpsc::Receiver<StoredEvent>>> {
        Arc::clone(&self.events_rx)
    }

    /// Transition to `Expired` and close the event channel. Idempotent:
    /// the sender is dropped exactly once, gated on the state change.
    pub fn close(&self) {
        let mut fields = self.fields.write();
        if fields.state == SessionState::Expired {
            return;
        }
        fields.state = SessionState::Expired;
        drop(fields);

        self.events_tx.lock().take();
        debug!(session = %self.id, "session closed");
    }
}

fn generate_session_id() -> String {
    let value: u128 = rand::rng().random();
    format!("{value:032x}")
}

/// Owns every live session. All mutating operations lock the table first,
/// then the individual session.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            idle_timeout,
        })
    }

    /// Create a session. At capacity, expired-idle sessions are swept
    /// first; if the table is still full the create fails.
    pub fn create(&self, context: SessionContext) -> McpResult<Arc<Session>> {
        if self.sessions.read().len() >= self.max_sessions {
            self.cleanup();
        }

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            return Err(McpError::Internal("maximum session limit reached".into()));
        }

        let session = Session::new(context);
        sessions.insert(session.id().to_string(), Arc::clone(&session));
        debug!(session = %session.id(), total = sessions.len(), "session created");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Close and remove one session. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    /// Remove every session idle longer than the configured timeout.
    pub fn cleanup(&self) -> usize {
        let stale: Vec<Arc<Session>> = {
            let sessions = self.sessions.read();
            sessions
                .values()
                .filter(|s| s.idle_for() > self.idle_timeout)
                .cloned()
                .collect()
        };

        if stale.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write();
        let mut removed = 0;
        for session in stale {
            if sessions.remove(session.id()).is_some() {
                session.close();
                removed += 1;
            }
        }
        debug!(removed, "session cleanup pass");
        removed
    }

    /// Deliver a notification to every `Ready` session; full queues drop.
    /// Returns the number of sessions that accepted the event.
    pub fn broadcast(&self, notification: &JsonRpcNotification) -> usize {
        let targets: Vec<Arc<Session>> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.state() == SessionState::Ready)
            .cloned()
            .collect();

        targets
            .iter()
            .filter(|s| s.send_notification(notification))
            .count()
    }

    /// Like [`broadcast`](Self::broadcast), but only to sessions
    /// subscribed to `uri`.
    pub fn broadcast_to_subscribers(
        &self,
        uri: &str,
        notification: &JsonRpcNotification,
    ) -> usize {
        let targets: Vec<Arc<Session>> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.state() == SessionState::Ready && s.is_subscribed(uri))
            .cloned()
            .collect();

        targets
            .iter()
            .filter(|s| s.send_notification(notification))
            .count()
    }

    /// Periodic cleanup sweeper ([`CLEANUP_INTERVAL`] is the usual
    /// period). Aborting the returned handle stops it.
    pub fn start_sweeper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                manager.cleanup();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max: usize, timeout: Duration) -> Arc<SessionManager> {
        SessionManager::new(max, timeout)
    }

    fn ready_session(manager: &SessionManager) -> Arc<Session> {
        let session = manager.create(SessionContext::default()).unwrap();
        session
            .set_initialized("2025-06-18".into(), Implementation::default(), serde_json::json!({}))
            .unwrap();
        session.mark_ready().unwrap();
        session
    }

    #[test]
    fn session_ids_are_128_bit_hex() {
        let id = generate_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn lifecycle_is_forward_only() {
        let m = manager(4, Duration::from_secs(60));
        let session = m.create(SessionContext::default()).unwrap();
        assert_eq!(session.state(), SessionState::New);

        // ready before initialized is a state violation
        assert!(matches!(session.mark_ready(), Err(McpError::NotInitialized)));

        session
            .set_initialized("2025-06-18".into(), Implementation::default(), serde_json::json!({}))
            .unwrap();
        assert_eq!(session.state(), SessionState::Initialized);

        // double initialize is rejected
        assert!(
            session
                .set_initialized("2025-06-18".into(), Implementation::default(), serde_json::json!({}))
                .is_err()
        );

        session.mark_ready().unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        session.close();
        assert_eq!(session.state(), SessionState::Expired);
    }

    #[test]
    fn capacity_limit_fails_fast() {
        let m = manager(2, Duration::from_secs(600));
        m.create(SessionContext::default()).unwrap();
        m.create(SessionContext::default()).unwrap();
        let err = m.create(SessionContext::default()).unwrap_err();
        assert!(err.to_string().contains("maximum session limit reached"));
    }

    #[test]
    fn create_at_capacity_sweeps_idle_sessions_first() {
        let m = manager(2, Duration::from_millis(1));
        let a = m.create(SessionContext::default()).unwrap();
        let b = m.create(SessionContext::default()).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        // both are idle past the timeout, so the third create evicts them
        let c = m.create(SessionContext::default()).unwrap();
        assert_eq!(a.state(), SessionState::Expired);
        assert_eq!(b.state(), SessionState::Expired);
        assert_eq!(c.state(), SessionState::New);
        assert_eq!(m.len(), 1);
    }

    #[tokio::test]
    async fn delete_closes_event_channel_exactly_once() {
        let m = manager(4, Duration::from_secs(60));
        let session = ready_session(&m);
        let id = session.id().to_string();
        let rx = session.events();

        assert!(session.send_notification(&JsonRpcNotification::new("notifications/test", None)));
        assert!(m.delete(&id));
        // second delete is a no-op
        assert!(!m.delete(&id));

        let mut rx = rx.lock().await;
        // queued event is still delivered, then the channel reports closed
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn broadcast_skips_non_ready_sessions() {
        let m = manager(8, Duration::from_secs(60));
        let fresh = m.create(SessionContext::default()).unwrap();
        let ready = ready_session(&m);

        let delivered = m.broadcast(&JsonRpcNotification::new(
            "notifications/resources/list_changed",
            None,
        ));
        assert_eq!(delivered, 1);
        assert_eq!(fresh.state(), SessionState::New);
        drop(ready);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let m = manager(4, Duration::from_secs(60));
        let session = ready_session(&m);

        let notification = JsonRpcNotification::new("notifications/test", None);
        for _ in 0..EVENT_QUEUE_CAPACITY {
            assert!(session.send_notification(&notification));
        }
        // queue is full now; the send reports failure instead of blocking
        assert!(!session.send_notification(&notification));
    }

    #[test]
    fn subscriptions_gate_targeted_broadcast() {
        let m = manager(4, Duration::from_secs(60));
        let subscribed = ready_session(&m);
        let other = ready_session(&m);
        subscribed.subscribe("mock://logs");

        let delivered = m.broadcast_to_subscribers(
            "mock://logs",
            &JsonRpcNotification::new("notifications/resources/updated", None),
        );
        assert_eq!(delivered, 1);
        assert!(subscribed.is_subscribed("mock://logs"));
        assert!(!other.is_subscribed("mock://logs"));
    }

    #[test]
    fn replay_returns_events_after_id() {
        let m = manager(4, Duration::from_secs(60));
        let session = ready_session(&m);
        for _ in 0..5 {
            session.send_notification(&JsonRpcNotification::new("notifications/test", None));
        }
        let tail = session.replay_after(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id, 4);
        assert_eq!(tail[1].id, 5);
    }
}
