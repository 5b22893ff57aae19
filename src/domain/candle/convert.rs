//! Conversion: CandleWire → Candle.

use super::wire::CandleWire;
use super::Candle;

impl From<CandleWire> for Candle {
    fn from(c: CandleWire) -> Self {
        Candle {
            timestamp: c.timestamp,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}
