//! Candle domain: OHLCV bars and live trade ticks.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar. `timestamp` is the bar's open time in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A single trade to fold into the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveTick {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub price: f64,
    pub volume: f64,
}

impl Candle {
    /// A fresh bar opened by `tick` at `bucket_start`.
    pub fn open_with(bucket_start: i64, tick: &LiveTick) -> Self {
        Self {
            timestamp: bucket_start,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.volume,
        }
    }

    /// Fold a tick belonging to this bar.
    pub fn absorb(&mut self, tick: &LiveTick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        self.volume += tick.volume;
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        crate::domain::millis_to_utc(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_absorb() {
        let mut c = Candle::open_with(
            60_000,
            &LiveTick {
                timestamp: 61_000,
                price: 10.0,
                volume: 1.0,
            },
        );
        c.absorb(&LiveTick {
            timestamp: 62_000,
            price: 12.0,
            volume: 2.0,
        });
        c.absorb(&LiveTick {
            timestamp: 63_000,
            price: 9.0,
            volume: 0.5,
        });
        assert_eq!(c.timestamp, 60_000);
        assert_eq!((c.open, c.high, c.low, c.close), (10.0, 12.0, 9.0, 9.0));
        assert_eq!(c.volume, 3.5);
        assert!(!c.is_bullish());
    }

    #[test]
    fn test_wire_accepts_time_alias() {
        let w: wire::CandleWire =
            serde_json::from_str(r#"{"time":60000,"open":1,"high":2,"low":0.5,"close":1.5}"#)
                .unwrap();
        let c = Candle::from(w);
        assert_eq!(c.timestamp, 60_000);
        assert_eq!(c.volume, 0.0);
    }
}
