//! Wire types for orderbook responses (REST + WS).

use crate::shared::Ticker;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orderbook payload from `GET /api/orderbooks/{ticker}` and `orderbook:{ticker}`.
///
/// REST responses are always full books; WS messages set `is_snapshot` to
/// tell a full replacement from a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderbookWire {
    #[serde(default)]
    pub ticker: Option<Ticker>,
    #[serde(default)]
    pub is_snapshot: bool,
    #[serde(default = "Vec::new")]
    pub bids: Vec<BookLevelWire>,
    #[serde(default = "Vec::new")]
    pub asks: Vec<BookLevelWire>,
    /// Unix milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// A single price level. Side is implicit from the `bids`/`asks` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookLevelWire {
    pub price: Decimal,
    pub size: Decimal,
}
