//! Conversion: AssetWire → AssetValuation.

use super::wire::{AssetWire, HoldingWire};
use super::{AssetValuation, Holding};
use crate::shared::UserId;
use rust_decimal::Decimal;

impl From<HoldingWire> for Holding {
    fn from(h: HoldingWire) -> Self {
        Holding {
            name: h.name.unwrap_or_else(|| h.ticker.to_string()),
            ticker: h.ticker,
            quantity: h.quantity,
            avg_price: h.avg_price,
            current_price: h.current_price,
        }
    }
}

impl AssetValuation {
    /// Build from a wire payload; `fallback` supplies the user when absent.
    pub fn from_wire(wire: AssetWire, fallback: &UserId) -> Self {
        let holdings: Vec<Holding> = wire.holdings.into_iter().map(Holding::from).collect();
        let market_value: Decimal = holdings.iter().map(Holding::market_value).sum();
        AssetValuation {
            user_id: wire.user_id.unwrap_or_else(|| fallback.clone()),
            cash: wire.cash,
            total_value: wire.total_value.unwrap_or(wire.cash + market_value),
            holdings,
        }
    }
}
