//! Candles sub-client: backward-paged history.

use crate::client::FeedClient;
use crate::domain::candle::Candle;
use crate::error::SdkError;
use crate::shared::{Interval, Ticker};

/// Sub-client for candle history.
pub struct Candles<'a> {
    pub(crate) client: &'a FeedClient,
}

impl<'a> Candles<'a> {
    /// One page of history, skipping `offset` bars back from the newest.
    pub async fn page(
        &self,
        ticker: &Ticker,
        interval: Interval,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Candle>, SdkError> {
        let resp = self
            .client
            .http
            .get_candles(ticker, interval, offset, limit)
            .await?;
        Ok(resp.candles.into_iter().map(Candle::from).collect())
    }
}
