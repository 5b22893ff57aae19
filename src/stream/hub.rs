//! Per-session subscription front door.
//!
//! The first subscription opens (or reuses) the session's connection. When
//! the last one is dropped the connection is closed after a grace window;
//! any subscription made inside the window cancels the close.

use crate::error::{SdkError, WsError};
use crate::stream::connection::{ConnectionHandle, ConnectionManager, Session};
use crate::stream::multiplexer::{Handler, Multiplexer, SubscriptionId};
use crate::ws::{ConnectionStatus, Topic};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Delay before closing an idle connection. 0 closes on the next timer tick.
    pub deactivate_grace_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            deactivate_grace_ms: 0,
        }
    }
}

#[derive(Default)]
struct HubState {
    connection: Option<ConnectionHandle>,
    /// Bumped by every subscribe and every scheduled deactivation.
    idle_epoch: u64,
}

struct HubInner {
    manager: Arc<ConnectionManager>,
    session: Session,
    mux: Multiplexer,
    config: HubConfig,
    state: Mutex<HubState>,
}

impl HubInner {
    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(self: &Arc<Self>, id: SubscriptionId) {
        self.mux.unsubscribe(id);
        if !self.mux.is_empty() {
            return;
        }

        let epoch = {
            let mut state = self.state();
            state.idle_epoch += 1;
            state.idle_epoch
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let weak = Arc::downgrade(self);
                let grace = Duration::from_millis(self.config.deactivate_grace_ms);
                runtime.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.deactivate_if_idle(epoch);
                    }
                });
            }
            Err(_) => self.deactivate_if_idle(epoch),
        }
    }

    fn deactivate_if_idle(&self, epoch: u64) {
        let handle = {
            let mut state = self.state();
            if state.idle_epoch != epoch || !self.mux.is_empty() {
                return;
            }
            state.connection.take()
        };
        if let Some(handle) = handle {
            tracing::info!(session = %self.session.id, "No subscribers left, closing connection");
            self.manager.close(&handle);
        }
    }
}

/// Subscription front door for one session. Cheap to clone.
#[derive(Clone)]
pub struct StreamHub {
    inner: Arc<HubInner>,
}

impl StreamHub {
    pub fn new(manager: Arc<ConnectionManager>, session: Session, config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                manager,
                session,
                mux: Multiplexer::new(),
                config,
                state: Mutex::new(HubState::default()),
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Register `handler` for `topic`, opening the connection if needed.
    ///
    /// Dropping the returned [`Subscription`] detaches the handler.
    pub fn subscribe(&self, topic: Topic, handler: Handler) -> Result<Subscription, SdkError> {
        {
            let mut state = self.inner.state();
            state.idle_epoch += 1;
            let alive = state
                .connection
                .as_ref()
                .is_some_and(|h| self.inner.manager.is_alive(h));
            if !alive {
                let handle = self.inner.manager.open(&self.inner.session, &self.inner.mux)?;
                state.connection = Some(handle);
            }
        }

        let id = self.inner.mux.subscribe(topic.clone(), handler);
        Ok(Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
            topic,
        })
    }

    /// Publish to a topic on the session's connection.
    pub fn publish(&self, topic: &Topic, payload: serde_json::Value) -> Result<(), WsError> {
        self.inner.mux.publish(topic, payload)
    }

    pub fn status(&self) -> Option<ConnectionStatus> {
        self.inner.state().connection.as_ref().map(|h| h.status())
    }

    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.inner.state().connection.clone()
    }

    pub fn active_topics(&self) -> Vec<Topic> {
        self.inner.mux.active_topics()
    }

    pub fn multiplexer(&self) -> &Multiplexer {
        &self.inner.mux
    }

    /// Close the session's connection now. Subscriptions stay registered and
    /// reconnect on the next `subscribe`.
    pub fn end_session(&self) {
        self.inner.state().connection = None;
        self.inner.manager.end_session(&self.inner.session.id);
    }
}

impl std::fmt::Debug for StreamHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHub")
            .field("session", &self.inner.session.id)
            .field("mux", &self.inner.mux)
            .finish()
    }
}

/// One live handler registration. Detaches on drop.
pub struct Subscription {
    hub: Weak<HubInner>,
    id: SubscriptionId,
    topic: Topic,
}

impl Subscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn detach(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.release(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Update;
    use crate::shared::{Ticker, UserId};
    use crate::stream::connection::{Credential, SessionId};
    use crate::stream::testing::{settle, FakeConnector};
    use crate::ws::WsEvent;

    fn hub(grace_ms: u64) -> (StreamHub, Arc<FakeConnector>, Arc<ConnectionManager>) {
        let connector = Arc::new(FakeConnector::default());
        let manager = Arc::new(ConnectionManager::new(connector.clone()));
        let session = Session::new(SessionId::new("s1"), UserId::from("u1"), Credential::new("t"));
        let hub = StreamHub::new(
            manager.clone(),
            session,
            HubConfig {
                deactivate_grace_ms: grace_ms,
            },
        );
        (hub, connector, manager)
    }

    fn noop() -> Handler {
        Arc::new(|_: &Update| {})
    }

    fn price(t: &str) -> Topic {
        Topic::Price(Ticker::from(t))
    }

    #[tokio::test]
    async fn test_connection_opened_lazily_and_shared() {
        let (hub, connector, _) = hub(0);
        assert_eq!(connector.open_count(), 0);
        assert!(hub.status().is_none());

        let _a = hub.subscribe(price("AAPL"), noop()).unwrap();
        let _b = hub.subscribe(price("MSFT"), noop()).unwrap();
        assert_eq!(connector.open_count(), 1);

        let (bus, tx) = connector.last();
        tx.send(WsEvent::Connected { generation: 1 }).await.unwrap();
        settle().await;
        assert_eq!(bus.subscribes().len(), 2);
    }

    #[tokio::test]
    async fn test_last_drop_closes_after_grace() {
        let (hub, connector, manager) = hub(0);
        let sub = hub.subscribe(price("AAPL"), noop()).unwrap();
        let (bus, _tx) = connector.last();

        drop(sub);
        assert!(!bus.is_closed(), "close is deferred to the next tick");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(bus.is_closed());
        assert_eq!(manager.connection_count(), 0);
        assert!(hub.connection().is_none());
    }

    #[tokio::test]
    async fn test_resubscribe_within_grace_keeps_connection() {
        let (hub, connector, _) = hub(50);
        let sub = hub.subscribe(price("AAPL"), noop()).unwrap();
        let (bus, _tx) = connector.last();

        drop(sub);
        let _again = hub.subscribe(price("MSFT"), noop()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!bus.is_closed());
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_after_close_reopens() {
        let (hub, connector, _) = hub(0);
        drop(hub.subscribe(price("AAPL"), noop()).unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let _sub = hub.subscribe(price("AAPL"), noop()).unwrap();
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_session_subscribe_fails_without_registering() {
        let connector = Arc::new(FakeConnector::default());
        let manager = Arc::new(ConnectionManager::new(connector.clone()));
        let session = Session::new(SessionId::new("s1"), UserId::from("u1"), Credential::new("t"))
            .with_expiry(chrono::Utc::now() - chrono::Duration::seconds(5));
        let hub = StreamHub::new(manager, session, HubConfig::default());

        assert!(hub.subscribe(price("AAPL"), noop()).is_err());
        assert!(hub.active_topics().is_empty());
        assert_eq!(connector.open_count(), 0);
    }
}
