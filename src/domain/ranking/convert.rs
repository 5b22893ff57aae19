//! Conversion: RankingWire → RankingBoard.

use super::wire::{RankingEntryWire, RankingWire};
use super::{RankingBoard, RankingEntry};
use crate::shared::RankingMode;

impl From<RankingEntryWire> for RankingEntry {
    fn from(e: RankingEntryWire) -> Self {
        RankingEntry {
            name: e.name.unwrap_or_else(|| e.ticker.to_string()),
            rank: e.rank,
            ticker: e.ticker,
            value: e.value,
            change_rate: e.change_rate,
        }
    }
}

impl RankingBoard {
    /// Build from a wire payload; entries are ordered by rank.
    pub fn from_wire(wire: RankingWire, fallback: RankingMode) -> Self {
        let mut entries: Vec<RankingEntry> =
            wire.entries.into_iter().map(RankingEntry::from).collect();
        entries.sort_by_key(|e| e.rank);
        RankingBoard {
            mode: wire.mode.unwrap_or(fallback),
            entries,
        }
    }
}
