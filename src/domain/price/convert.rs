//! Conversion: TickerPriceWire → TickerPrice.

use super::wire::TickerPriceWire;
use super::TickerPrice;
use crate::shared::Ticker;

impl TickerPrice {
    /// Build from a wire payload; `fallback` supplies the ticker when absent.
    pub fn from_wire(wire: TickerPriceWire, fallback: &Ticker) -> Self {
        let price = wire.price;
        Self {
            ticker: wire.ticker.unwrap_or_else(|| fallback.clone()),
            price,
            open_price: wire.open_price.unwrap_or(price),
            high: wire.high.unwrap_or(price),
            low: wire.low.unwrap_or(price),
            change: wire.change,
            change_rate: wire.change_rate,
            volume: wire.volume,
            trade_volume: wire.trade_volume,
            timestamp: wire.timestamp,
        }
    }
}
