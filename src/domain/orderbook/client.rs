//! Orderbooks sub-client: full-depth snapshots.

use crate::client::FeedClient;
use crate::domain::orderbook::OrderbookView;
use crate::domain::Snapshot;
use crate::error::SdkError;
use crate::stream::SnapshotSource;
use crate::shared::Ticker;
use crate::ws::Topic;

/// Sub-client for orderbook operations.
pub struct Orderbooks<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Orderbooks<'a> {
    /// Full book and market state (never cached).
    pub async fn snapshot(&self, ticker: &Ticker) -> Result<Snapshot<OrderbookView>, SdkError> {
        self.client
            .http
            .orderbook(ticker)
            .await
            .map_err(|source| SdkError::Snapshot {
                topic: Topic::Orderbook(ticker.clone()).to_string(),
                source,
            })
    }
}
