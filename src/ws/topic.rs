//! Topic naming, parsing, and matching.

use crate::shared::{RankingMode, Ticker, UserId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// The data domain a topic belongs to.
///
/// Each domain learns its market state from its own snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Price,
    Orderbook,
    Ranking,
    Asset,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Price => "price",
            Domain::Orderbook => "orderbook",
            Domain::Ranking => "ranking",
            Domain::Asset => "asset",
        }
    }
}

/// A named logical channel on the message bus.
///
/// Wire format is the plain string `"{domain}:{key}"`, e.g. `price:AAPL`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    Price(Ticker),
    Orderbook(Ticker),
    Ranking(RankingMode),
    Asset(UserId),
}

impl Topic {
    pub fn domain(&self) -> Domain {
        match self {
            Topic::Price(_) => Domain::Price,
            Topic::Orderbook(_) => Domain::Orderbook,
            Topic::Ranking(_) => Domain::Ranking,
            Topic::Asset(_) => Domain::Asset,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Price(ticker) => write!(f, "price:{ticker}"),
            Topic::Orderbook(ticker) => write!(f, "orderbook:{ticker}"),
            Topic::Ranking(mode) => write!(f, "ranking:{mode}"),
            Topic::Asset(user) => write!(f, "asset:{user}"),
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, key) = s
            .split_once(':')
            .ok_or_else(|| format!("topic without domain: {s}"))?;
        if key.is_empty() {
            return Err(format!("topic without key: {s}"));
        }
        match domain {
            "price" => Ok(Topic::Price(Ticker::from(key))),
            "orderbook" => Ok(Topic::Orderbook(Ticker::from(key))),
            "ranking" => Ok(Topic::Ranking(key.parse()?)),
            "asset" => Ok(Topic::Asset(UserId::from(key))),
            other => Err(format!("unknown topic domain: {other}")),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_wire_names() {
        assert_eq!(Topic::Price(Ticker::from("AAPL")).to_string(), "price:AAPL");
        assert_eq!(
            Topic::Orderbook(Ticker::from("005930")).to_string(),
            "orderbook:005930"
        );
        assert_eq!(
            Topic::Ranking(RankingMode::PriceRise).to_string(),
            "ranking:rise"
        );
        assert_eq!(Topic::Asset(UserId::from("u-1")).to_string(), "asset:u-1");
    }

    #[test]
    fn test_topic_parse() {
        let t: Topic = "ranking:volume".parse().unwrap();
        assert_eq!(t, Topic::Ranking(RankingMode::TradeVolume));
        assert_eq!(t.domain(), Domain::Ranking);

        assert!("price".parse::<Topic>().is_err());
        assert!("price:".parse::<Topic>().is_err());
        assert!("weather:seoul".parse::<Topic>().is_err());
        assert!("ranking:unknown".parse::<Topic>().is_err());
    }

    #[test]
    fn test_ticker_key_may_contain_colon() {
        let t: Topic = "price:KRW:BTC".parse().unwrap();
        assert_eq!(t, Topic::Price(Ticker::from("KRW:BTC")));
    }

    #[test]
    fn test_topic_serializes_as_string() {
        let json = serde_json::to_string(&Topic::Price(Ticker::from("AAPL"))).unwrap();
        assert_eq!(json, "\"price:AAPL\"");
        let back: Topic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Topic::Price(Ticker::from("AAPL")));
    }
}
