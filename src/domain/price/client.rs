//! Prices sub-client: one-shot ticker snapshots.

use crate::client::FeedClient;
use crate::domain::price::TickerPrice;
use crate::domain::Snapshot;
use crate::error::SdkError;
use crate::stream::SnapshotSource;
use crate::shared::Ticker;
use crate::ws::Topic;

/// Sub-client for price operations.
pub struct Prices<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Prices<'a> {
    /// Latest price and market state (never cached).
    pub async fn snapshot(&self, ticker: &Ticker) -> Result<Snapshot<TickerPrice>, SdkError> {
        self.client
            .http
            .price(ticker)
            .await
            .map_err(|source| SdkError::Snapshot {
                topic: Topic::Price(ticker.clone()).to_string(),
                source,
            })
    }
}
