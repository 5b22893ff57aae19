//! Wire types for ranking boards.

use crate::shared::{RankingMode, Ticker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ranking payload from `GET /api/rankings/{mode}` and `ranking:{mode}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingWire {
    #[serde(default)]
    pub mode: Option<RankingMode>,
    #[serde(default = "Vec::new")]
    pub entries: Vec<RankingEntryWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntryWire {
    pub rank: u32,
    pub ticker: Ticker,
    #[serde(default)]
    pub name: Option<String>,
    /// The ranked quantity: volume, price, or asset value depending on mode.
    pub value: Decimal,
    #[serde(default)]
    pub change_rate: f64,
}
