//! Backward-page bookkeeping for one (ticker, interval) key.

use crate::shared::{Interval, Ticker};
use std::collections::HashSet;

/// Identity of a loaded series. A response for another key is stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub ticker: Ticker,
    pub interval: Interval,
}

impl SeriesKey {
    pub fn new(ticker: Ticker, interval: Interval) -> Self {
        Self { ticker, interval }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.ticker, self.interval)
    }
}

/// A candle page the caller should fetch and hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: SeriesKey,
    pub epoch: u64,
    /// Candles already loaded, counted back from now.
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn is_initial(&self) -> bool {
        self.offset == 0
    }
}

/// Requested offsets, exhaustion, and the reset epoch.
#[derive(Debug, Default)]
pub struct Pagination {
    epoch: u64,
    requested: HashSet<u32>,
    exhausted: bool,
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_requested(&self, offset: u32) -> bool {
        self.requested.contains(&offset)
    }

    /// Offsets claimed since the last reset, completed ones included.
    pub fn requested_count(&self) -> usize {
        self.requested.len()
    }

    /// Forget everything and invalidate responses still in flight.
    pub fn reset(&mut self) -> u64 {
        self.epoch += 1;
        self.requested.clear();
        self.exhausted = false;
        self.epoch
    }

    /// Claim `offset`. Refused when already claimed or when history ran out.
    pub fn claim(&mut self, offset: u32) -> bool {
        if self.exhausted {
            return false;
        }
        self.requested.insert(offset)
    }

    /// Record how many new candles a page added. None marks the key exhausted.
    pub fn complete(&mut self, inserted: usize) {
        if inserted == 0 {
            self.exhausted = true;
        }
    }

    /// Give a failed offset back so it can be retried.
    pub fn release(&mut self, offset: u32) {
        self.requested.remove(&offset);
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }
}
