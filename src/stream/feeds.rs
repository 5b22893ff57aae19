//! The `on_*_update` registrations: one gated feed per call.
//!
//! Each feed is just a topic, a snapshot fetcher, and a payload type; the
//! connection, multiplexing, and gating are shared.

use crate::domain::asset::AssetValuation;
use crate::domain::orderbook::OrderbookView;
use crate::domain::price::TickerPrice;
use crate::domain::ranking::RankingBoard;
use crate::error::SdkError;
use crate::shared::{RankingMode, Ticker};
use crate::stream::gate::{fetch_fn, FeedHandle, FeedPayload, FetchFn, GatedFeed};
use crate::stream::hub::StreamHub;
use crate::stream::source::SnapshotSource;
use crate::ws::Topic;
use std::sync::Arc;

/// Live market feeds for one session.
#[derive(Clone)]
pub struct MarketFeeds {
    hub: StreamHub,
    source: Arc<dyn SnapshotSource>,
}

impl MarketFeeds {
    pub fn new(hub: StreamHub, source: Arc<dyn SnapshotSource>) -> Self {
        Self { hub, source }
    }

    pub fn hub(&self) -> &StreamHub {
        &self.hub
    }

    pub async fn on_price_update(
        &self,
        ticker: Ticker,
        handler: impl Fn(&TickerPrice) + Send + Sync + 'static,
    ) -> Result<FeedHandle<TickerPrice>, SdkError> {
        let source = self.source.clone();
        let key = ticker.clone();
        let fetch = fetch_fn(move || {
            let source = source.clone();
            let key = key.clone();
            async move { source.price(&key).await }
        });
        self.start(Topic::Price(ticker), fetch, handler).await
    }

    pub async fn on_orderbook_update(
        &self,
        ticker: Ticker,
        handler: impl Fn(&OrderbookView) + Send + Sync + 'static,
    ) -> Result<FeedHandle<OrderbookView>, SdkError> {
        let source = self.source.clone();
        let key = ticker.clone();
        let fetch = fetch_fn(move || {
            let source = source.clone();
            let key = key.clone();
            async move { source.orderbook(&key).await }
        });
        self.start(Topic::Orderbook(ticker), fetch, handler).await
    }

    pub async fn on_ranking_update(
        &self,
        mode: RankingMode,
        handler: impl Fn(&RankingBoard) + Send + Sync + 'static,
    ) -> Result<FeedHandle<RankingBoard>, SdkError> {
        let source = self.source.clone();
        let fetch = fetch_fn(move || {
            let source = source.clone();
            async move { source.ranking(mode).await }
        });
        self.start(Topic::Ranking(mode), fetch, handler).await
    }

    /// The session user's asset valuation.
    pub async fn on_asset_update(
        &self,
        handler: impl Fn(&AssetValuation) + Send + Sync + 'static,
    ) -> Result<FeedHandle<AssetValuation>, SdkError> {
        let user = self.hub.session().user.clone();
        let source = self.source.clone();
        let key = user.clone();
        let fetch = fetch_fn(move || {
            let source = source.clone();
            let key = key.clone();
            async move { source.asset(&key).await }
        });
        self.start(Topic::Asset(user), fetch, handler).await
    }

    async fn start<T: FeedPayload>(
        &self,
        topic: Topic,
        fetch: FetchFn<T>,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<FeedHandle<T>, SdkError> {
        GatedFeed::start(self.hub.clone(), topic, fetch, Arc::new(handler)).await
    }
}

impl std::fmt::Debug for MarketFeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFeeds").field("hub", &self.hub).finish()
    }
}
