//! Ranking domain: leaderboards by volume, rise, fall, and total asset.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod wire;

use crate::shared::{RankingMode, Ticker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub ticker: Ticker,
    pub name: String,
    pub value: Decimal,
    pub change_rate: f64,
}

/// One leaderboard, ordered by rank ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingBoard {
    pub mode: RankingMode,
    pub entries: Vec<RankingEntry>,
}

impl RankingBoard {
    pub fn top(&self, n: usize) -> &[RankingEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn rank_of(&self, ticker: &Ticker) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| &e.ticker == ticker)
            .map(|e| e.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::wire::{RankingEntryWire, RankingWire};
    use super::*;

    fn entry(rank: u32, ticker: &str) -> RankingEntryWire {
        RankingEntryWire {
            rank,
            ticker: Ticker::from(ticker),
            name: None,
            value: Decimal::from(rank * 10),
            change_rate: 0.0,
        }
    }

    #[test]
    fn test_entries_sorted_by_rank() {
        let board = RankingBoard::from_wire(
            RankingWire {
                mode: None,
                entries: vec![entry(3, "C"), entry(1, "A"), entry(2, "B")],
            },
            RankingMode::TradeVolume,
        );
        assert_eq!(board.mode, RankingMode::TradeVolume);
        let ranks: Vec<u32> = board.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(board.entries[0].name, "A");
    }

    #[test]
    fn test_top_and_rank_of() {
        let board = RankingBoard::from_wire(
            RankingWire {
                mode: Some(RankingMode::PriceRise),
                entries: vec![entry(1, "A"), entry(2, "B")],
            },
            RankingMode::TradeVolume,
        );
        assert_eq!(board.mode, RankingMode::PriceRise);
        assert_eq!(board.top(5).len(), 2);
        assert_eq!(board.top(1)[0].ticker, Ticker::from("A"));
        assert_eq!(board.rank_of(&Ticker::from("B")), Some(2));
        assert_eq!(board.rank_of(&Ticker::from("Z")), None);
    }
}
