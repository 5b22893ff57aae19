//! # marketfeed
//!
//! Real-time market-data streaming and a candlestick chart controller for
//! trading UIs.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: shared newtypes, domain models, wire types (always available)
//! 2. **HTTP API**: `FeedHttp` snapshot and candle-page endpoints with retry policies
//! 3. **WebSocket**: message envelope, topics, and the `tokio-tungstenite` transport
//! 4. **Streaming**: per-session connections, topic multiplexing, market-state gating
//! 5. **Chart**: sans-IO candle paging, scroll preservation, pane sync, annotations
//! 6. **High-Level Client**: `FeedClient` with nested sub-clients
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketfeed::prelude::*;
//!
//! let client = FeedClient::builder()
//!     .base_url("https://api.marketfeed.dev")
//!     .build()?;
//!
//! let session = Session::new(SessionId::new("tab-1"), UserId::from("u-1"), Credential::new(token));
//! let feeds = client.streams(session);
//! let _price = feeds
//!     .on_price_update(Ticker::from("AAPL"), |p| println!("{} {}", p.ticker, p.price))
//!     .await?;
//!
//! let mut chart = client.chart();
//! chart.set_ticker(Ticker::from("AAPL")).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

/// JSON-loadable configuration.
pub mod config;

// ── Layer 2: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with retry policies.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 3: WebSocket ───────────────────────────────────────────────────────

/// WebSocket messages, topics, events, and the native transport.
pub mod ws;

// ── Layer 4: Streaming ───────────────────────────────────────────────────────

/// Connections, multiplexing, and snapshot-gated feeds.
pub mod stream;

// ── Layer 5: Chart ───────────────────────────────────────────────────────────

/// Candlestick chart controller.
pub mod chart;

// ── Layer 6: High-Level Client ───────────────────────────────────────────────

/// `FeedClient`, the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{Interval, RankingMode, Ticker, UserId};

    // Domain types
    pub use crate::domain::asset::{AssetValuation, Holding};
    pub use crate::domain::candle::{Candle, LiveTick};
    pub use crate::domain::orderbook::{BookLevel, OrderbookState, OrderbookView};
    pub use crate::domain::price::{Direction, TickerPrice};
    pub use crate::domain::ranking::{RankingBoard, RankingEntry};
    pub use crate::domain::{MarketState, Snapshot, Update};

    // Errors
    pub use crate::error::{HttpError, SdkError, SessionError, WsError};

    // Network + config
    pub use crate::config::FeedConfig;
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_WS_URL};

    // HTTP client + sub-clients
    #[cfg(feature = "http")]
    pub use crate::client::{
        AssetsClient, CandlesClient, FeedClient, FeedClientBuilder, OrderbooksClient,
        PricesClient, RankingsClient,
    };
    #[cfg(feature = "http")]
    pub use crate::http::{FeedHttp, RetryConfig, RetryDecision, RetryPolicy};

    // WebSocket types
    pub use crate::ws::{ConnectionState, ConnectionStatus, MessageOut, Topic, WsConfig, WsEvent};

    // Streaming
    pub use crate::stream::{
        CandleSource, Credential, FeedHandle, GateOutcome, MarketFeeds, Session, SessionId,
        SnapshotSource, StreamHub, Subscription,
    };

    // Chart
    pub use crate::chart::{
        AnchorPoint, Annotations, ChartConfig, ChartController, ChartFrame, ChartLoader,
        IndicatorConfig, LoadOutcome, LogicalRange, Pane, PageRequest, RangeSync,
    };
}
