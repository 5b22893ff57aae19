//! Orderbook domain: per-ticker depth, snapshots and deltas.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod state;
pub mod wire;

pub use state::OrderbookState;

use crate::shared::Ticker;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// An orderbook message: a full book when `is_snapshot`, otherwise a delta
/// where a zero size removes the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookView {
    pub ticker: Ticker,
    pub is_snapshot: bool,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    /// Unix milliseconds.
    pub timestamp: i64,
}
