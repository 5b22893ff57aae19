//! Wire types for ticker price snapshots and live price messages.

use crate::shared::Ticker;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price payload, shared by `GET /api/tickers/{ticker}/snapshot` and `price:{ticker}`.
///
/// Live messages may omit the ticker; it is taken from the topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerPriceWire {
    #[serde(default)]
    pub ticker: Option<Ticker>,
    pub price: Decimal,
    #[serde(default)]
    pub open_price: Option<Decimal>,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub change: Decimal,
    #[serde(default)]
    pub change_rate: f64,
    /// Accumulated volume for the session.
    #[serde(default)]
    pub volume: Decimal,
    /// Size of the trade that produced this update.
    #[serde(default)]
    pub trade_volume: Decimal,
    /// Unix milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}
