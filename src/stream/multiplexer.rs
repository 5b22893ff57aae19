//! Topic subscription multiplexer.
//!
//! Many local handlers per topic, at most one wire-level subscription per
//! topic. Owns the active topic set so it can replay it on every new
//! connection instance.

use crate::domain::Update;
use crate::error::WsError;
use crate::ws::{MessageBus, MessageOut, Topic};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

/// A local update handler.
pub type Handler = Arc<dyn Fn(&Update) + Send + Sync>;

/// Identifies one local registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct TopicEntry {
    /// In registration order.
    handlers: Vec<(SubscriptionId, Handler)>,
    /// A subscribe for this topic was sent on the current connection.
    wired: bool,
}

#[derive(Default)]
struct Inner {
    topics: BTreeMap<Topic, TopicEntry>,
    index: HashMap<SubscriptionId, Topic>,
    bus: Option<Arc<dyn MessageBus>>,
    /// Generation of the open connection; `None` while not connected.
    generation: Option<u64>,
    next_id: u64,
}

impl Inner {
    fn send(&self, msg: MessageOut) -> bool {
        let (Some(bus), Some(generation)) = (&self.bus, self.generation) else {
            return false;
        };
        match bus.send_wire(generation, msg) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(generation, "Wire command not sent: {}", e);
                false
            }
        }
    }
}

/// Reference-counting topic multiplexer. Cheap to clone.
#[derive(Clone, Default)]
pub struct Multiplexer {
    inner: Arc<Mutex<Inner>>,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Handlers never run under this lock, so poisoning can only come from
        // a panic inside the multiplexer itself; the state is still coherent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a handler. The first handler of a topic subscribes on the
    /// wire, now if connected or on the next `Connected` otherwise.
    pub fn subscribe(&self, topic: Topic, handler: Handler) -> SubscriptionId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.index.insert(id, topic.clone());

        let first = !inner.topics.contains_key(&topic);
        let entry = inner.topics.entry(topic.clone()).or_insert(TopicEntry {
            handlers: Vec::new(),
            wired: false,
        });
        entry.handlers.push((id, handler));

        if first {
            let wired = inner.send(MessageOut::subscribe(topic.clone()));
            if let Some(entry) = inner.topics.get_mut(&topic) {
                entry.wired = wired;
            }
            tracing::debug!(%topic, wired, "Topic activated");
        }
        id
    }

    /// Remove a handler. Removing the last handler of a topic unsubscribes
    /// on the wire if the topic was wired. Returns `false` for unknown ids.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let Some(topic) = inner.index.remove(&id) else {
            return false;
        };
        let Some(entry) = inner.topics.get_mut(&topic) else {
            return false;
        };
        entry.handlers.retain(|(h, _)| *h != id);
        if entry.handlers.is_empty() {
            let was_wired = entry.wired;
            inner.topics.remove(&topic);
            if was_wired {
                inner.send(MessageOut::unsubscribe(topic.clone()));
            }
            tracing::debug!(%topic, "Topic deactivated");
        }
        true
    }

    /// Deliver one inbound message to every handler of its topic.
    ///
    /// The payload is decoded once. A bad topic or payload drops only this
    /// message; a panicking handler does not stop later handlers.
    pub fn dispatch(&self, topic: &str, data: &serde_json::Value) {
        let topic: Topic = match topic.parse() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(topic, "Dropping message for unparseable topic: {}", e);
                return;
            }
        };

        let handlers: Vec<(SubscriptionId, Handler)> = match self.lock().topics.get(&topic) {
            Some(entry) => entry.handlers.clone(),
            None => {
                tracing::debug!(%topic, "Message for inactive topic");
                return;
            }
        };

        let update = match Update::decode(&topic, data) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(%topic, "Dropping malformed payload: {}", e);
                return;
            }
        };

        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&update))).is_err() {
                tracing::error!(%topic, subscription = id.0, "Update handler panicked");
            }
        }
    }

    /// Bind the write side of a connection. Topics are wired on `on_connected`.
    pub fn attach_bus(&self, bus: Arc<dyn MessageBus>) {
        let mut inner = self.lock();
        inner.bus = Some(bus);
        inner.generation = None;
        for entry in inner.topics.values_mut() {
            entry.wired = false;
        }
    }

    /// Unbind the connection. Topics stay registered for a later attach.
    pub fn detach_bus(&self) {
        let mut inner = self.lock();
        inner.bus = None;
        inner.generation = None;
        for entry in inner.topics.values_mut() {
            entry.wired = false;
        }
    }

    /// A new connection instance is open: replay every active topic on it.
    pub fn on_connected(&self, generation: u64) {
        let mut inner = self.lock();
        inner.generation = Some(generation);
        let topics: Vec<Topic> = inner.topics.keys().cloned().collect();
        let mut replayed = 0usize;
        for topic in topics {
            let wired = inner.send(MessageOut::subscribe(topic.clone()));
            if let Some(entry) = inner.topics.get_mut(&topic) {
                entry.wired = wired;
            }
            replayed += usize::from(wired);
        }
        tracing::info!(generation, replayed, "Subscriptions replayed");
    }

    /// The connection dropped; every topic must be re-wired on reconnect.
    pub fn on_disconnected(&self) {
        let mut inner = self.lock();
        inner.generation = None;
        for entry in inner.topics.values_mut() {
            entry.wired = false;
        }
    }

    /// Forward a client publish. Queued by the transport while disconnected.
    pub fn publish(&self, topic: &Topic, payload: serde_json::Value) -> Result<(), WsError> {
        let bus = self.lock().bus.clone().ok_or(WsError::NotConnected)?;
        bus.publish(topic, payload)
    }

    pub fn active_topics(&self) -> Vec<Topic> {
        self.lock().topics.keys().cloned().collect()
    }

    pub fn handler_count(&self, topic: &Topic) -> usize {
        self.lock()
            .topics
            .get(topic)
            .map_or(0, |entry| entry.handlers.len())
    }

    pub fn is_wired(&self, topic: &Topic) -> bool {
        self.lock().topics.get(topic).is_some_and(|entry| entry.wired)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().topics.is_empty()
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Multiplexer")
            .field("topics", &inner.topics.keys().collect::<Vec<_>>())
            .field("generation", &inner.generation)
            .finish()
    }
}
