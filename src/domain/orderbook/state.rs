//! Orderbook state container: app-owned, SDK-provided update logic.

use crate::domain::orderbook::{BookLevel, OrderbookView};
use crate::shared::Ticker;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Live orderbook for one ticker that can apply snapshots and deltas.
///
/// Deltas received before the first snapshot are ignored, so a book fed
/// by a gated feed never shows levels that predate its REST snapshot.
#[derive(Debug, Clone, Default)]
pub struct OrderbookState {
    pub ticker: Ticker,
    /// Timestamp of the last applied message (unix ms).
    pub updated_at: i64,
    has_snapshot: bool,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl OrderbookState {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            ..Self::default()
        }
    }

    /// Apply an orderbook message (snapshot replaces, delta merges).
    ///
    /// Returns `false` if the message was ignored.
    pub fn apply(&mut self, book: &OrderbookView) -> bool {
        if book.ticker != self.ticker {
            tracing::debug!(expected = %self.ticker, got = %book.ticker, "Orderbook for another ticker");
            return false;
        }
        if book.is_snapshot {
            self.bids.clear();
            self.asks.clear();
            self.has_snapshot = true;
        } else if !self.has_snapshot {
            tracing::debug!(ticker = %self.ticker, "Delta before first snapshot, ignoring");
            return false;
        }

        self.updated_at = book.timestamp;
        merge_side(&mut self.bids, &book.bids);
        merge_side(&mut self.asks, &book.asks);
        true
    }

    /// Bids sorted by price descending, at most `n`.
    pub fn top_bids(&self, n: usize) -> Vec<BookLevel> {
        self.bids
            .iter()
            .rev()
            .take(n)
            .map(|(&price, &size)| BookLevel { price, size })
            .collect()
    }

    /// Asks sorted by price ascending, at most `n`.
    pub fn top_asks(&self, n: usize) -> Vec<BookLevel> {
        self.asks
            .iter()
            .take(n)
            .map(|(&price, &size)| BookLevel { price, size })
            .collect()
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Mid price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total resting size on each side: `(bids, asks)`.
    pub fn total_size(&self) -> (Decimal, Decimal) {
        (self.bids.values().sum(), self.asks.values().sum())
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.has_snapshot = false;
        self.updated_at = 0;
    }
}

fn merge_side(side: &mut BTreeMap<Decimal, Decimal>, levels: &[BookLevel]) {
    for level in levels {
        if level.size.is_zero() {
            side.remove(&level.price);
        } else {
            side.insert(level.price, level.size);
        }
    }
}
