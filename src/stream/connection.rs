//! Connection lifecycle: at most one live connection per session.
//!
//! The manager is injected (no global singleton). Each open connection gets
//! an event pump task that feeds transport events into the session's
//! [`Multiplexer`]. A session with an expiry also gets a timer that closes
//! its connection when the session expires.

use crate::error::{SdkError, SessionError, WsError};
use crate::shared::UserId;
use crate::stream::multiplexer::Multiplexer;
use crate::ws::{ConnectionStatus, Connector, Kind, MessageBus, Topic, WsEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One authenticated user session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user: UserId,
    pub expires_at: Option<DateTime<Utc>>,
    credential: Credential,
}

impl Session {
    pub fn new(id: SessionId, user: UserId, credential: Credential) -> Self {
        Self {
            id,
            user,
            expires_at: None,
            credential,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Time left before expiry; zero once expired, `None` if it never expires.
    pub fn time_left(&self) -> Option<std::time::Duration> {
        self.expires_at
            .map(|at| (at - Utc::now()).to_std().unwrap_or_default())
    }
}

// ─── ConnectionHandle ────────────────────────────────────────────────────────

/// Shared handle to a session's connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    session: SessionId,
    bus: Arc<dyn MessageBus>,
}

impl ConnectionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn status(&self) -> ConnectionStatus {
        self.bus.watch_status().borrow().clone()
    }

    /// Observe state changes (Connecting, Open, Closed with `last_error`, ...).
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.bus.watch_status()
    }

    pub fn publish(&self, topic: &Topic, payload: serde_json::Value) -> Result<(), WsError> {
        self.bus.publish(topic, payload)
    }

    fn same_as(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.bus, &other.bus)
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("session", &self.session)
            .field("status", &self.status())
            .finish()
    }
}

// ─── ConnectionManager ───────────────────────────────────────────────────────

struct Slot {
    handle: ConnectionHandle,
    mux: Multiplexer,
    pump: JoinHandle<()>,
    expiry: Option<JoinHandle<()>>,
}

type Slots = Arc<Mutex<HashMap<SessionId, Slot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<SessionId, Slot>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

/// Opens, reuses, and closes per-session connections.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    slots: Slots,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SessionId, Slot>> {
        lock(&self.slots)
    }

    /// Return the session's connection, opening one if none is alive.
    ///
    /// A connection that is connecting, open, or waiting to reconnect is
    /// alive and is reused; `mux` is only bound on a fresh open.
    pub fn open(&self, session: &Session, mux: &Multiplexer) -> Result<ConnectionHandle, SdkError> {
        if session.is_expired() {
            return Err(SessionError::Expired(session.id.to_string()).into());
        }

        let mut slots = self.slots();
        if let Some(slot) = slots.get(&session.id) {
            if !slot.pump.is_finished() {
                return Ok(slot.handle.clone());
            }
            tracing::debug!(session = %session.id, "Previous connection ended, reopening");
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| WsError::ConnectionFailed("no tokio runtime available".into()))?;
        let (bus, events) = self.connector.open(session.credential().expose())?;
        mux.attach_bus(bus.clone());
        let pump = runtime.spawn(pump_events(events, mux.clone(), session.id.clone()));

        let handle = ConnectionHandle {
            session: session.id.clone(),
            bus,
        };
        let expiry = session
            .time_left()
            .map(|left| runtime.spawn(expire_after(left, Arc::downgrade(&self.slots), handle.clone())));
        tracing::info!(session = %session.id, expires_at = ?session.expires_at, "Connection opened");
        if let Some(old) = slots.insert(
            session.id.clone(),
            Slot {
                handle: handle.clone(),
                mux: mux.clone(),
                pump,
                expiry,
            },
        ) {
            if let Some(timer) = old.expiry {
                timer.abort();
            }
        }
        Ok(handle)
    }

    /// Close `handle` if it is still the session's connection.
    pub fn close(&self, handle: &ConnectionHandle) {
        let slot = {
            let mut slots = self.slots();
            match slots.get(&handle.session) {
                Some(slot) if slot.handle.same_as(handle) => slots.remove(&handle.session),
                _ => None,
            }
        };
        if let Some(slot) = slot {
            shutdown(slot);
        }
    }

    /// Close whatever connection the session has.
    pub fn end_session(&self, session: &SessionId) {
        let slot = self.slots().remove(session);
        if let Some(slot) = slot {
            shutdown(slot);
        }
    }

    pub fn is_alive(&self, handle: &ConnectionHandle) -> bool {
        self.slots()
            .get(&handle.session)
            .is_some_and(|slot| slot.handle.same_as(handle) && !slot.pump.is_finished())
    }

    pub fn connection_count(&self) -> usize {
        self.slots().len()
    }
}

fn shutdown(slot: Slot) {
    tracing::info!(session = %slot.handle.session, "Closing connection");
    if let Some(timer) = slot.expiry {
        timer.abort();
    }
    // Stop the pump first so no late event from this transport reaches the
    // multiplexer after it is rebound.
    slot.pump.abort();
    slot.mux.detach_bus();
    slot.handle.bus.close();
}

/// Close `handle` once its session expires, unless it was replaced or
/// closed first.
async fn expire_after(
    left: std::time::Duration,
    slots: Weak<Mutex<HashMap<SessionId, Slot>>>,
    handle: ConnectionHandle,
) {
    tokio::time::sleep(left).await;
    let Some(slots) = slots.upgrade() else {
        return;
    };
    let slot = {
        let mut slots = lock(&slots);
        match slots.get(&handle.session) {
            Some(slot) if slot.handle.same_as(&handle) => slots.remove(&handle.session),
            _ => None,
        }
    };
    if let Some(mut slot) = slot {
        tracing::warn!(session = %handle.session, "Session expired, closing connection");
        // This task is the timer; don't abort it mid-shutdown.
        slot.expiry = None;
        shutdown(slot);
    }
}

/// Feed transport events into the multiplexer, in arrival order.
async fn pump_events(mut events: mpsc::Receiver<WsEvent>, mux: Multiplexer, session: SessionId) {
    while let Some(event) = events.recv().await {
        match event {
            WsEvent::Message(Kind::Message(msg)) => mux.dispatch(&msg.topic, &msg.data),
            WsEvent::Message(Kind::Pong) => {}
            WsEvent::Message(Kind::Error(e)) => {
                tracing::warn!(%session, code = ?e.code, "Server error: {}", e.message);
            }
            WsEvent::Connected { generation } => mux.on_connected(generation),
            WsEvent::Disconnected { code, reason } => {
                tracing::info!(%session, ?code, %reason, "Connection lost");
                mux.on_disconnected();
            }
            WsEvent::Error(e) => tracing::warn!(%session, "Transport error: {}", e),
        }
    }
    mux.on_disconnected();
    tracing::debug!(%session, "Event pump finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Ticker;
    use crate::stream::testing::{settle, FakeConnector};
    use crate::ws::MessageOut;
    use serde_json::json;

    fn session(id: &str) -> Session {
        Session::new(
            SessionId::new(id),
            UserId::from("u1"),
            Credential::new(format!("token-{id}")),
        )
    }

    #[test]
    fn test_credential_is_redacted() {
        let s = session("a");
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("token-a"));
        assert!(dbg.contains("***"));
        assert_eq!(s.credential().expose(), "token-a");
    }

    #[test]
    fn test_expired_session_cannot_open() {
        let manager = ConnectionManager::new(Arc::new(FakeConnector::default()));
        let expired = session("a").with_expiry(Utc::now() - chrono::Duration::seconds(1));
        let err = manager.open(&expired, &Multiplexer::new()).unwrap_err();
        assert!(matches!(err, SdkError::Session(SessionError::Expired(ref id)) if id == "a"));
    }

    #[tokio::test]
    async fn test_open_is_idempotent_per_session() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();

        let a = manager.open(&session("a"), &mux).unwrap();
        let b = manager.open(&session("a"), &mux).unwrap();
        assert!(a.same_as(&b));
        assert_eq!(connector.open_count(), 1);
        assert_eq!(connector.opened.lock().unwrap()[0].0, "token-a");

        manager.open(&session("b"), &Multiplexer::new()).unwrap();
        assert_eq!(connector.open_count(), 2);
        assert_eq!(manager.connection_count(), 2);
    }

    #[tokio::test]
    async fn test_pump_feeds_multiplexer() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();
        manager.open(&session("a"), &mux).unwrap();

        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let topic = Topic::Price(Ticker::from("AAPL"));
        mux.subscribe(
            topic.clone(),
            Arc::new(move |_: &crate::domain::Update| *counter.lock().unwrap() += 1),
        );

        let (bus, tx) = connector.last();
        tx.send(WsEvent::Connected { generation: 1 }).await.unwrap();
        settle().await;
        assert_eq!(bus.sent_with_generation(), vec![(1, MessageOut::subscribe(topic.clone()))]);

        let raw = r#"{"type":"message","topic":"price:AAPL","data":{"price":"5"}}"#;
        let msg: crate::ws::MessageIn = serde_json::from_str(raw).unwrap();
        tx.send(WsEvent::Message(msg.kind)).await.unwrap();
        settle().await;
        assert_eq!(*seen.lock().unwrap(), 1);

        tx.send(WsEvent::Disconnected {
            code: Some(1006),
            reason: "gone".into(),
        })
        .await
        .unwrap();
        settle().await;
        assert!(!mux.is_wired(&topic));
    }

    #[tokio::test]
    async fn test_reopen_after_transport_task_ended() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();
        let first = manager.open(&session("a"), &mux).unwrap();

        connector.hang_up();
        settle().await;
        assert!(!manager.is_alive(&first));

        let second = manager.open(&session("a"), &mux).unwrap();
        assert!(!first.same_as(&second));
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_close_detaches_and_closes_bus() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();
        let handle = manager.open(&session("a"), &mux).unwrap();
        let (bus, _tx) = connector.last();

        manager.close(&handle);
        assert!(bus.is_closed());
        assert_eq!(manager.connection_count(), 0);
        assert!(matches!(
            mux.publish(&Topic::Price(Ticker::from("AAPL")), json!({})),
            Err(WsError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_ignores_stale_handle() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();
        let stale = manager.open(&session("a"), &mux).unwrap();
        manager.end_session(&SessionId::new("a"));
        let fresh = manager.open(&session("a"), &mux).unwrap();

        manager.close(&stale);
        assert!(manager.is_alive(&fresh));
    }

    #[tokio::test]
    async fn test_connection_closed_when_session_expires() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();
        let short = session("a").with_expiry(Utc::now() + chrono::Duration::milliseconds(50));
        let handle = manager.open(&short, &mux).unwrap();
        let (bus, _tx) = connector.last();
        assert!(manager.is_alive(&handle));

        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert!(bus.is_closed());
        assert!(!manager.is_alive(&handle));
        assert_eq!(manager.connection_count(), 0);

        let err = manager.open(&short, &mux).unwrap_err();
        assert!(matches!(err, SdkError::Session(SessionError::Expired(_))));
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_expiry_timer_ignores_replaced_connection() {
        let connector = Arc::new(FakeConnector::default());
        let manager = ConnectionManager::new(connector.clone());
        let mux = Multiplexer::new();
        let short = session("a").with_expiry(Utc::now() + chrono::Duration::milliseconds(50));
        manager.open(&short, &mux).unwrap();
        manager.end_session(&SessionId::new("a"));

        let fresh = manager.open(&session("a"), &mux).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert!(manager.is_alive(&fresh));
    }
}
