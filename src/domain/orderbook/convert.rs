//! Conversion: OrderbookWire → OrderbookView.

use super::wire::{BookLevelWire, OrderbookWire};
use super::{BookLevel, OrderbookView};
use crate::shared::Ticker;

impl From<BookLevelWire> for BookLevel {
    fn from(level: BookLevelWire) -> Self {
        BookLevel {
            price: level.price,
            size: level.size,
        }
    }
}

impl OrderbookView {
    /// Build from a wire payload; `fallback` supplies the ticker when absent.
    pub fn from_wire(wire: OrderbookWire, fallback: &Ticker) -> Self {
        OrderbookView {
            ticker: wire.ticker.unwrap_or_else(|| fallback.clone()),
            is_snapshot: wire.is_snapshot,
            bids: wire.bids.into_iter().map(BookLevel::from).collect(),
            asks: wire.asks.into_iter().map(BookLevel::from).collect(),
            timestamp: wire.timestamp,
        }
    }

    /// REST books are complete regardless of the flag on the wire.
    pub(crate) fn from_rest(wire: OrderbookWire, fallback: &Ticker) -> Self {
        let mut view = Self::from_wire(wire, fallback);
        view.is_snapshot = true;
        view
    }
}
