//! Asset domain: a user's cash, holdings, and their live valuation.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod wire;

use crate::shared::{Ticker, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One position valued at the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: Ticker,
    pub name: String,
    pub quantity: Decimal,
    pub avg_price: Decimal,
    pub current_price: Decimal,
}

impl Holding {
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.avg_price
    }

    pub fn profit_loss(&self) -> Decimal {
        self.market_value() - self.cost_basis()
    }

    /// Percent return on cost; `None` for a zero cost basis.
    pub fn return_rate(&self) -> Option<Decimal> {
        let cost = self.cost_basis();
        if cost.is_zero() {
            return None;
        }
        Some(self.profit_loss() / cost * Decimal::from(100))
    }
}

/// Total valuation of one user's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetValuation {
    pub user_id: UserId,
    pub cash: Decimal,
    pub total_value: Decimal,
    pub holdings: Vec<Holding>,
}

impl AssetValuation {
    pub fn profit_loss(&self) -> Decimal {
        self.holdings.iter().map(Holding::profit_loss).sum()
    }

    pub fn holding(&self, ticker: &Ticker) -> Option<&Holding> {
        self.holdings.iter().find(|h| &h.ticker == ticker)
    }
}
