//! Consumed data sources: REST snapshots and candle pages.
//!
//! Both are traits so applications and tests can substitute their own
//! fetchers. [`FeedHttp`](crate::http::FeedHttp) implements both.

use crate::domain::asset::AssetValuation;
use crate::domain::candle::Candle;
use crate::domain::orderbook::OrderbookView;
use crate::domain::price::TickerPrice;
use crate::domain::ranking::RankingBoard;
use crate::domain::Snapshot;
use crate::error::HttpError;
use crate::shared::{Interval, RankingMode, Ticker, UserId};
use futures_util::future::BoxFuture;

/// One-shot snapshot fetches, one per feed domain.
pub trait SnapshotSource: Send + Sync {
    fn price(&self, ticker: &Ticker) -> BoxFuture<'_, Result<Snapshot<TickerPrice>, HttpError>>;

    fn orderbook(
        &self,
        ticker: &Ticker,
    ) -> BoxFuture<'_, Result<Snapshot<OrderbookView>, HttpError>>;

    fn ranking(&self, mode: RankingMode)
        -> BoxFuture<'_, Result<Snapshot<RankingBoard>, HttpError>>;

    fn asset(&self, user: &UserId) -> BoxFuture<'_, Result<Snapshot<AssetValuation>, HttpError>>;
}

/// Backward-paged candle history.
pub trait CandleSource: Send + Sync {
    /// Up to `limit` candles, skipping the `offset` newest. Any order.
    fn fetch_page(
        &self,
        ticker: &Ticker,
        interval: Interval,
        offset: u32,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<Candle>, HttpError>>;
}

#[cfg(feature = "http")]
mod http_impl {
    use super::*;
    use crate::http::FeedHttp;

    impl SnapshotSource for FeedHttp {
        fn price(
            &self,
            ticker: &Ticker,
        ) -> BoxFuture<'_, Result<Snapshot<TickerPrice>, HttpError>> {
            let ticker = ticker.clone();
            Box::pin(async move {
                let env = self.get_ticker_snapshot(&ticker).await?;
                Ok(env.into_snapshot(|w| TickerPrice::from_wire(w, &ticker)))
            })
        }

        fn orderbook(
            &self,
            ticker: &Ticker,
        ) -> BoxFuture<'_, Result<Snapshot<OrderbookView>, HttpError>> {
            let ticker = ticker.clone();
            Box::pin(async move {
                let env = self.get_orderbook(&ticker).await?;
                Ok(env.into_snapshot(|w| OrderbookView::from_rest(w, &ticker)))
            })
        }

        fn ranking(
            &self,
            mode: RankingMode,
        ) -> BoxFuture<'_, Result<Snapshot<RankingBoard>, HttpError>> {
            Box::pin(async move {
                let env = self.get_ranking(mode).await?;
                Ok(env.into_snapshot(|w| RankingBoard::from_wire(w, mode)))
            })
        }

        fn asset(
            &self,
            user: &UserId,
        ) -> BoxFuture<'_, Result<Snapshot<AssetValuation>, HttpError>> {
            let user = user.clone();
            Box::pin(async move {
                let env = self.get_user_assets(&user).await?;
                Ok(env.into_snapshot(|w| AssetValuation::from_wire(w, &user)))
            })
        }
    }

    impl CandleSource for FeedHttp {
        fn fetch_page(
            &self,
            ticker: &Ticker,
            interval: Interval,
            offset: u32,
            limit: u32,
        ) -> BoxFuture<'_, Result<Vec<Candle>, HttpError>> {
            let ticker = ticker.clone();
            Box::pin(async move {
                let resp = self.get_candles(&ticker, interval, offset, limit).await?;
                Ok(resp.candles.into_iter().map(Candle::from).collect())
            })
        }
    }
}
