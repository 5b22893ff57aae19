//! Market-state gate: snapshot first, then stream only while the market is open.
//!
//! Each feed learns its market state from its own snapshot. A refresh
//! always delivers the snapshot to the handler before any subscription
//! exists, so the first streamed update can never overtake it.

use crate::domain::asset::AssetValuation;
use crate::domain::orderbook::OrderbookView;
use crate::domain::price::TickerPrice;
use crate::domain::ranking::RankingBoard;
use crate::domain::{MarketState, Snapshot, Update};
use crate::error::{HttpError, SdkError};
use crate::stream::hub::{StreamHub, Subscription};
use crate::ws::Topic;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// A payload type that a gated feed delivers.
pub trait FeedPayload: Clone + Send + Sync + 'static {
    /// Pick this feed's payload out of a multiplexed update.
    fn from_update(update: &Update) -> Option<Self>;
}

impl FeedPayload for TickerPrice {
    fn from_update(update: &Update) -> Option<Self> {
        match update {
            Update::Price(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl FeedPayload for OrderbookView {
    fn from_update(update: &Update) -> Option<Self> {
        match update {
            Update::Orderbook(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FeedPayload for RankingBoard {
    fn from_update(update: &Update) -> Option<Self> {
        match update {
            Update::Ranking(r) => Some(r.clone()),
            _ => None,
        }
    }
}

impl FeedPayload for AssetValuation {
    fn from_update(update: &Update) -> Option<Self> {
        match update {
            Update::Asset(a) => Some(a.clone()),
            _ => None,
        }
    }
}

pub type SnapshotFuture<T> = BoxFuture<'static, Result<Snapshot<T>, HttpError>>;

/// Produces one snapshot fetch per call.
pub type FetchFn<T> = Arc<dyn Fn() -> SnapshotFuture<T> + Send + Sync>;

/// Wrap an async snapshot fetcher as a [`FetchFn`].
pub fn fetch_fn<T, F, Fut>(fetch: F) -> FetchFn<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Snapshot<T>, HttpError>> + Send + 'static,
{
    Arc::new(move || -> SnapshotFuture<T> { Box::pin(fetch()) })
}

/// Per-feed payload handler, shared by snapshots and streamed updates.
pub type PayloadHandler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Snapshot delivered and the feed is streaming.
    Streaming,
    /// Snapshot delivered; market closed, no live subscription.
    SnapshotOnly,
    /// A newer refresh or a detach superseded this one; nothing delivered.
    Stale,
}

#[derive(Default)]
struct FeedState {
    epoch: u64,
    detached: bool,
    live: Option<Subscription>,
    market: Option<MarketState>,
}

struct FeedInner<T> {
    hub: StreamHub,
    topic: Topic,
    fetch: FetchFn<T>,
    handler: PayloadHandler<T>,
    state: Mutex<FeedState>,
}

impl<T> FeedInner<T> {
    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, epoch: u64) -> bool {
        let state = self.state();
        !state.detached && state.epoch == epoch
    }
}

/// A snapshot-gated live feed. Dropping it detaches the handler.
pub struct GatedFeed<T: FeedPayload> {
    inner: Arc<FeedInner<T>>,
}

/// Returned by [`MarketFeeds`](crate::stream::MarketFeeds) registrations.
pub type FeedHandle<T> = GatedFeed<T>;

impl<T: FeedPayload> GatedFeed<T> {
    /// Create the feed and run its first refresh.
    ///
    /// A failed first snapshot is returned as [`SdkError::Snapshot`]; no
    /// subscription is attempted and nothing is retried.
    pub async fn start(
        hub: StreamHub,
        topic: Topic,
        fetch: FetchFn<T>,
        handler: PayloadHandler<T>,
    ) -> Result<Self, SdkError> {
        let feed = Self {
            inner: Arc::new(FeedInner {
                hub,
                topic,
                fetch,
                handler,
                state: Mutex::new(FeedState::default()),
            }),
        };
        feed.refresh().await?;
        Ok(feed)
    }

    /// Fetch a fresh snapshot, deliver it, then open or tear down the live
    /// subscription according to the reported market state.
    pub async fn refresh(&self) -> Result<GateOutcome, SdkError> {
        let inner = &self.inner;
        let epoch = {
            let mut state = inner.state();
            if state.detached {
                return Ok(GateOutcome::Stale);
            }
            state.epoch += 1;
            state.epoch
        };

        let result = (inner.fetch)().await;

        if !inner.is_current(epoch) {
            tracing::debug!(topic = %inner.topic, epoch, "Discarding superseded snapshot");
            return Ok(GateOutcome::Stale);
        }

        let snapshot = result.map_err(|source| {
            tracing::warn!(topic = %inner.topic, "Snapshot fetch failed: {}", source);
            SdkError::Snapshot {
                topic: inner.topic.to_string(),
                source,
            }
        })?;
        inner.state().market = Some(snapshot.market);

        (inner.handler)(&snapshot.value);

        if !snapshot.market.open {
            let dropped = inner.state().live.take();
            if dropped.is_some() {
                tracing::info!(topic = %inner.topic, "Market closed, stream torn down");
            }
            drop(dropped);
            return Ok(GateOutcome::SnapshotOnly);
        }

        if inner.state().live.is_some() {
            return Ok(GateOutcome::Streaming);
        }

        let handler = inner.handler.clone();
        let subscription = inner.hub.subscribe(
            inner.topic.clone(),
            Arc::new(move |update: &Update| {
                if let Some(value) = T::from_update(update) {
                    handler(&value);
                }
            }),
        )?;

        let mut state = inner.state();
        if state.detached || state.epoch != epoch {
            drop(state);
            drop(subscription);
            return Ok(GateOutcome::Stale);
        }
        tracing::debug!(topic = %inner.topic, "Market open, streaming");
        state.live = Some(subscription);
        Ok(GateOutcome::Streaming)
    }

    pub fn topic(&self) -> &Topic {
        &self.inner.topic
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.state().live.is_some()
    }

    /// Market state from the latest accepted snapshot.
    pub fn market(&self) -> Option<MarketState> {
        self.inner.state().market
    }

    /// Stop delivering. In-flight refreshes are ignored on arrival.
    pub fn detach(&self) {
        let live = {
            let mut state = self.inner.state();
            state.detached = true;
            state.epoch += 1;
            state.live.take()
        };
        drop(live);
    }
}

impl<T: FeedPayload> Drop for GatedFeed<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T: FeedPayload> std::fmt::Debug for GatedFeed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedFeed")
            .field("topic", &self.inner.topic)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

/// Free-function form of [`GatedFeed::start`].
pub async fn snapshot_then_maybe_stream<T: FeedPayload>(
    hub: StreamHub,
    topic: Topic,
    fetch: FetchFn<T>,
    handler: PayloadHandler<T>,
) -> Result<FeedHandle<T>, SdkError> {
    GatedFeed::start(hub, topic, fetch, handler).await
}
