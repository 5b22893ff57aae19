//! WebSocket layer: messages, topics, events, connection status.
//!
//! The actual WS transport lives behind the `ws-native` feature
//! (`tokio-tungstenite`, native.rs). The streaming core only talks to it
//! through the [`MessageBus`] and [`Connector`] traits defined here, so any
//! duplex channel that speaks the same JSON envelope can be plugged in.

pub mod topic;

#[cfg(feature = "ws-native")]
pub mod native;

use crate::error::WsError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub use topic::{Domain, Topic};

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MessageOut {
    #[serde(rename = "subscribe")]
    Subscribe { topic: Topic },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: Topic },
    #[serde(rename = "publish")]
    Publish {
        topic: Topic,
        payload: serde_json::Value,
    },
    #[serde(rename = "ping")]
    Ping,
}

impl MessageOut {
    pub fn subscribe(topic: Topic) -> Self {
        MessageOut::Subscribe { topic }
    }

    pub fn unsubscribe(topic: Topic) -> Self {
        MessageOut::Unsubscribe { topic }
    }

    pub fn ping() -> Self {
        MessageOut::Ping
    }
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// Raw inbound message from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageIn {
    #[serde(flatten)]
    pub kind: Kind,
}

/// The type of inbound WebSocket message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Kind {
    #[serde(rename = "message")]
    Message(TopicMessage),
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error(WsErrorPayload),
}

/// A data message for one topic.
///
/// `topic` stays a raw string and `data` stays untyped here: both are decoded
/// by the multiplexer so a bad payload only costs that one message.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicMessage {
    pub topic: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsErrorPayload {
    pub message: String,
    pub code: Option<String>,
}

// ─── WsEvent ─────────────────────────────────────────────────────────────────

/// High-level events emitted by a transport to the streaming core.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// A parsed message from the server.
    Message(Kind),
    /// A new connection instance is open. Wire commands must carry this generation.
    Connected { generation: u64 },
    /// Connection lost (a reconnect may follow).
    Disconnected { code: Option<u16>, reason: String },
    /// A deserialization or protocol error.
    Error(String),
}

// ─── Connection status ───────────────────────────────────────────────────────

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Observable connection status. Transport failures surface only here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub reconnect_attempt: u32,
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Configuration for the WS client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    pub url: String,
    pub reconnect: bool,
    /// Fixed delay between reconnect attempts (no exponential growth).
    pub reconnect_delay_ms: u64,
    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            reconnect: true,
            reconnect_delay_ms: 10_000,
            max_reconnect_attempts: None,
            heartbeat_interval_ms: 10_000,
            heartbeat_timeout_ms: 5_000,
            connect_timeout_ms: 30_000,
        }
    }
}

impl WsConfig {
    pub fn should_reconnect(&self, attempts: u32) -> bool {
        self.reconnect && self.max_reconnect_attempts.map_or(true, |max| attempts < max)
    }
}

// ─── Transport seams ─────────────────────────────────────────────────────────

/// The write side of one connection, as seen by the multiplexer.
pub trait MessageBus: Send + Sync {
    /// Send a subscribe/unsubscribe for connection instance `generation`.
    ///
    /// Transports drop commands whose generation is no longer current.
    fn send_wire(&self, generation: u64, msg: MessageOut) -> Result<(), WsError>;

    /// Publish to a topic. Queued while disconnected.
    fn publish(&self, topic: &Topic, payload: serde_json::Value) -> Result<(), WsError>;

    /// Subscribe to status changes.
    fn watch_status(&self) -> watch::Receiver<ConnectionStatus>;

    /// Ask the connection to close. Does not wait.
    fn close(&self);
}

/// Opens message-bus connections for a bearer credential.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        credential: &str,
    ) -> Result<(Arc<dyn MessageBus>, mpsc::Receiver<WsEvent>), WsError>;
}
