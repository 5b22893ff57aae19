//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs`: Rich domain types
//! - `wire.rs`: Raw serde structs matching backend responses and WS payloads
//! - `convert.rs`: Wire → domain conversions
//! - `state.rs`: State containers with update methods (for WS-driven data)
//! - `client.rs`: Sub-client with HTTP methods
//!
//! Every REST snapshot carries the market `open` flag next to its payload;
//! [`Snapshot`] keeps the two together.

pub mod asset;
pub mod candle;
pub mod orderbook;
pub mod price;
pub mod ranking;

use crate::ws::{Domain, Topic};
use serde::{Deserialize, Serialize};

use asset::AssetValuation;
use orderbook::OrderbookView;
use price::TickerPrice;
use ranking::RankingBoard;

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Market state reported alongside a snapshot.
///
/// Each domain learns it from its own snapshot; there is no global flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub open: bool,
}

/// A REST snapshot together with the market state it was taken under.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    pub market: MarketState,
}

impl<T> Snapshot<T> {
    pub fn new(value: T, open: bool) -> Self {
        Self {
            value,
            market: MarketState { open },
        }
    }

    pub fn is_open(&self) -> bool {
        self.market.open
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Snapshot<U> {
        Snapshot {
            value: f(self.value),
            market: self.market,
        }
    }
}

/// Wire envelope: payload fields flattened next to `open`.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEnvelope<W> {
    #[serde(flatten)]
    pub data: W,
    #[serde(default)]
    pub open: bool,
}

impl<W> SnapshotEnvelope<W> {
    pub fn into_snapshot<T>(self, convert: impl FnOnce(W) -> T) -> Snapshot<T> {
        Snapshot::new(convert(self.data), self.open)
    }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// A decoded live payload, fanned out to every handler of its topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Price(TickerPrice),
    Orderbook(OrderbookView),
    Ranking(RankingBoard),
    Asset(AssetValuation),
}

impl Update {
    /// Decode a message `data` object according to the topic's domain.
    ///
    /// Keys missing from the payload (ticker, mode, user) are filled in from
    /// the topic itself.
    pub fn decode(topic: &Topic, data: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match topic {
            Topic::Price(ticker) => {
                let wire = price::wire::TickerPriceWire::deserialize(data)?;
                Ok(Update::Price(TickerPrice::from_wire(wire, ticker)))
            }
            Topic::Orderbook(ticker) => {
                let wire = orderbook::wire::OrderbookWire::deserialize(data)?;
                Ok(Update::Orderbook(OrderbookView::from_wire(wire, ticker)))
            }
            Topic::Ranking(mode) => {
                let wire = ranking::wire::RankingWire::deserialize(data)?;
                Ok(Update::Ranking(RankingBoard::from_wire(wire, *mode)))
            }
            Topic::Asset(user) => {
                let wire = asset::wire::AssetWire::deserialize(data)?;
                Ok(Update::Asset(AssetValuation::from_wire(wire, user)))
            }
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Update::Price(_) => Domain::Price,
            Update::Orderbook(_) => Domain::Orderbook,
            Update::Ranking(_) => Domain::Ranking,
            Update::Asset(_) => Domain::Asset,
        }
    }
}

/// Convert unix milliseconds to a UTC timestamp, if in range.
pub(crate) fn millis_to_utc(ms: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(ms)
}
