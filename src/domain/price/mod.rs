//! Price domain: per-ticker last price and session statistics.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod wire;

use crate::domain::candle::LiveTick;
use crate::shared::Ticker;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Latest price of one ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerPrice {
    pub ticker: Ticker,
    pub price: Decimal,
    pub open_price: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub change: Decimal,
    /// Percent change against the previous close.
    pub change_rate: f64,
    pub volume: Decimal,
    pub trade_volume: Decimal,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Direction of the last change, for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl TickerPrice {
    pub fn direction(&self) -> Direction {
        if self.change > Decimal::ZERO {
            Direction::Up
        } else if self.change < Decimal::ZERO {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        crate::domain::millis_to_utc(self.timestamp)
    }

    /// The trade this update represents, for folding into the current candle.
    pub fn to_live_tick(&self) -> LiveTick {
        LiveTick {
            timestamp: self.timestamp,
            price: self.price.to_f64().unwrap_or(0.0),
            volume: self.trade_volume.to_f64().unwrap_or(0.0),
        }
    }
}
