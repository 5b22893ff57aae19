//! Wire types for candle pages.

use serde::{Deserialize, Serialize};

/// REST response for `GET /api/candles`.
///
/// Pages are counted backward from "now": `offset` candles are skipped from
/// the newest end. Order inside the page is not guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandlesResponse {
    #[serde(default = "Vec::new")]
    pub candles: Vec<CandleWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandleWire {
    /// Bar open time, unix milliseconds.
    #[serde(alias = "time")]
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}
