//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw format the backend sends, so they can be used directly in wire types
//! without conversion overhead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── Ticker ──────────────────────────────────────────────────────────────────

/// Newtype for instrument symbols (e.g. `"005930"`, `"AAPL"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Ticker(s.to_string()))
    }
}

impl Serialize for Ticker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Ticker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Ticker(s))
    }
}

// ─── UserId ──────────────────────────────────────────────────────────────────

/// Identifier of the signed-in user whose asset valuation is streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─── RankingMode ─────────────────────────────────────────────────────────────

/// Which leaderboard a ranking feed tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankingMode {
    #[serde(rename = "volume")]
    TradeVolume,
    #[serde(rename = "rise")]
    PriceRise,
    #[serde(rename = "fall")]
    PriceFall,
    #[serde(rename = "asset")]
    TotalAsset,
}

impl RankingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TradeVolume => "volume",
            Self::PriceRise => "rise",
            Self::PriceFall => "fall",
            Self::TotalAsset => "asset",
        }
    }
}

impl std::fmt::Display for RankingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volume" => Ok(Self::TradeVolume),
            "rise" => Ok(Self::PriceRise),
            "fall" => Ok(Self::PriceFall),
            "asset" => Ok(Self::TotalAsset),
            other => Err(format!("unknown ranking mode: {other}")),
        }
    }
}

// ─── Interval ────────────────────────────────────────────────────────────────

/// Candle interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "3m")]
    Minute3,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute3 => "3m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }

    /// Duration of one candle in seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Minute1 => 60,
            Self::Minute3 => 180,
            Self::Minute5 => 300,
            Self::Minute15 => 900,
            Self::Minute30 => 1800,
            Self::Hour1 => 3600,
            Self::Hour4 => 14_400,
            Self::Day1 => 86_400,
        }
    }

    /// Duration of one candle in milliseconds.
    pub fn millis(&self) -> i64 {
        self.seconds() as i64 * 1000
    }

    /// Start of the bar containing `timestamp_ms` (UTC-aligned).
    pub fn bucket_start(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.millis()) * self.millis()
    }

    /// Candles requested on the first load.
    ///
    /// Shorter intervals go deeper in candle count since each bar covers less
    /// wall-clock time.
    pub fn initial_count(&self) -> u32 {
        match self {
            Self::Minute1 => 500,
            Self::Minute3 | Self::Minute5 => 400,
            Self::Minute15 | Self::Minute30 => 300,
            Self::Hour1 | Self::Hour4 => 200,
            Self::Day1 => 150,
        }
    }

    /// Candles requested per backward page.
    pub fn load_more_count(&self) -> u32 {
        match self {
            Self::Minute1 => 200,
            Self::Minute3 | Self::Minute5 => 150,
            Self::Minute15 | Self::Minute30 | Self::Hour1 => 100,
            Self::Hour4 => 80,
            Self::Day1 => 60,
        }
    }

    pub fn all() -> &'static [Interval] {
        &[
            Self::Minute1,
            Self::Minute3,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
        ]
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|i| i.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown interval: {s}"))
    }
}
