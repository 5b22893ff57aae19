//! Streaming core: one multiplexed connection per session feeding many
//! independent handlers, each gated on its own snapshot's market state.
//!
//! ```text
//! MarketFeeds::on_*_update
//!        │  GatedFeed: snapshot → handler → (open?) subscribe
//!        ▼
//!   StreamHub (per session, deferred deactivation)
//!        │
//!   ConnectionManager ── Connector ── MessageBus (ws::native)
//!        │                               │ WsEvent
//!   Multiplexer ◀──────── event pump ◀───┘
//!        │  decode once, fan out
//!        ▼
//!    handlers
//! ```

pub mod connection;
pub mod feeds;
pub mod gate;
pub mod hub;
pub mod multiplexer;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ConnectionHandle, ConnectionManager, Credential, Session, SessionId};
pub use feeds::MarketFeeds;
pub use gate::{snapshot_then_maybe_stream, FeedHandle, FeedPayload, GateOutcome, GatedFeed};
pub use hub::{HubConfig, StreamHub, Subscription};
pub use multiplexer::{Handler, Multiplexer, SubscriptionId};
pub use source::{CandleSource, SnapshotSource};
