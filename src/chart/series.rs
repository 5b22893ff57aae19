//! Candle series container and merge rules.
//!
//! Invariant: timestamps strictly ascending and unique. History pages are
//! prepended; live bars replace or extend the tail.

use crate::domain::candle::Candle;

/// What a live bar did to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveMerge {
    /// Same timestamp as the tail; tail replaced in place.
    Replaced,
    /// Newer than the tail; appended.
    Appended,
    /// Older than the tail; ignored.
    Ignored,
}

/// Strictly ascending, timestamp-unique candle series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a page in any order. Duplicate timestamps keep the last seen.
    pub fn from_unsorted(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
        for c in candles {
            match out.last_mut() {
                Some(last) if last.timestamp == c.timestamp => *last = c,
                _ => out.push(c),
            }
        }
        Self { candles: out }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn contains_timestamp(&self, timestamp: i64) -> bool {
        self.candles
            .binary_search_by_key(&timestamp, |c| c.timestamp)
            .is_ok()
    }

    /// Index of the bar at or immediately before `timestamp`.
    pub fn index_at_or_before(&self, timestamp: i64) -> Option<usize> {
        match self.candles.binary_search_by_key(&timestamp, |c| c.timestamp) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// Prepend an older page. Returns how many candles were inserted.
    ///
    /// Candles already present, or not strictly older than the current head,
    /// are dropped as overlap. Applying the same page twice inserts nothing
    /// the second time.
    pub fn prepend_page(&mut self, page: Vec<Candle>) -> usize {
        let page = Self::from_unsorted(page).candles;
        let head = self.candles.first().map(|c| c.timestamp);
        let older: Vec<Candle> = match head {
            Some(head) => page.into_iter().filter(|c| c.timestamp < head).collect(),
            None => page,
        };
        let inserted = older.len();
        if inserted > 0 {
            let mut merged = older;
            merged.append(&mut self.candles);
            self.candles = merged;
        }
        inserted
    }

    /// Merge a live bar into the tail.
    pub fn merge_live(&mut self, candle: Candle) -> LiveMerge {
        match self.candles.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                *last = candle;
                LiveMerge::Replaced
            }
            Some(last) if last.timestamp > candle.timestamp => LiveMerge::Ignored,
            _ => {
                self.candles.push(candle);
                LiveMerge::Appended
            }
        }
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Candle> {
        self.candles.last_mut()
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }

    pub fn is_strictly_ascending(&self) -> bool {
        self.candles
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }
}
