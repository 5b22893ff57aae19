//! Wire types for asset valuations.

use crate::shared::{Ticker, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asset payload from `GET /api/users/{user}/assets` and `asset:{user}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetWire {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub cash: Decimal,
    #[serde(default)]
    pub holdings: Vec<HoldingWire>,
    /// Server-computed total; recomputed from holdings when absent.
    #[serde(default)]
    pub total_value: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingWire {
    pub ticker: Ticker,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: Decimal,
    pub avg_price: Decimal,
    pub current_price: Decimal,
}
