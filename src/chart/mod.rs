//! Candlestick chart controller.
//!
//! [`ChartController`] owns the series, paging state, viewport and pane sync
//! for one chart. It performs no I/O: loads are returned as [`PageRequest`]s,
//! and the caller hands results back through `complete_*`. Responses whose
//! key or epoch no longer match are discarded as stale.
//!
//! [`ChartLoader`] drives a controller against a [`CandleSource`].

pub mod annotation;
pub mod coords;
pub mod pagination;
pub mod render;
pub mod series;
pub mod sync;
pub mod viewport;

pub use annotation::{AnchorPoint, Annotations, Line, LineId, Segment};
pub use coords::CoordinateMapper;
pub use pagination::{PageRequest, Pagination, SeriesKey};
pub use render::{describe, ChartFrame, IndicatorConfig};
pub use series::{CandleSeries, LiveMerge};
pub use sync::{Mirror, Pane, RangeSync};
pub use viewport::{LogicalRange, ScrollPreserver, Viewport};

use crate::domain::candle::{Candle, LiveTick};
use crate::error::SdkError;
use crate::shared::{Interval, Ticker};
use crate::stream::CandleSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub interval: Interval,
    /// Load more once the visible `from` index drops below this.
    pub near_start_threshold: f64,
    /// Overrides [`Interval::initial_count`].
    pub initial_count: Option<u32>,
    /// Overrides [`Interval::load_more_count`].
    pub load_more_count: Option<u32>,
    pub indicators: IndicatorConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            interval: Interval::Minute1,
            near_start_threshold: 100.0,
            initial_count: None,
            load_more_count: None,
            indicators: IndicatorConfig::default(),
        }
    }
}

impl ChartConfig {
    pub fn initial_count(&self, interval: Interval) -> u32 {
        self.initial_count.unwrap_or_else(|| interval.initial_count())
    }

    pub fn load_more_count(&self, interval: Interval) -> u32 {
        self.load_more_count
            .unwrap_or_else(|| interval.load_more_count())
    }
}

/// Result of handing a page back to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        inserted: usize,
        /// Set when the view was shifted to keep the same bars on screen.
        preserved: Option<LogicalRange>,
    },
    /// Empty page; no further loads for this key.
    Exhausted,
    /// Key or epoch changed while the request was in flight.
    Stale,
}

#[derive(Debug)]
pub struct ChartController {
    config: ChartConfig,
    interval: Interval,
    ticker: Option<Ticker>,
    series: CandleSeries,
    pages: Pagination,
    viewport: Viewport,
    sync: RangeSync,
    annotations: Annotations,
}

impl Default for ChartController {
    fn default() -> Self {
        Self::new(ChartConfig::default())
    }
}

impl ChartController {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            interval: config.interval,
            config,
            ticker: None,
            series: CandleSeries::new(),
            pages: Pagination::new(),
            viewport: Viewport::default(),
            sync: RangeSync::new(),
            annotations: Annotations::new(),
        }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.ticker.as_ref()
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn key(&self) -> Option<SeriesKey> {
        self.ticker
            .clone()
            .map(|t| SeriesKey::new(t, self.interval))
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pages
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    pub fn is_exhausted(&self) -> bool {
        self.pages.is_exhausted()
    }

    /// Switch ticker and start over. Returns the initial page to fetch.
    pub fn set_ticker(&mut self, ticker: Ticker) -> PageRequest {
        self.ticker = Some(ticker.clone());
        self.restart(SeriesKey::new(ticker, self.interval))
    }

    /// Switch interval. Returns `None` until a ticker is set.
    pub fn set_interval(&mut self, interval: Interval) -> Option<PageRequest> {
        self.interval = interval;
        let key = self.key()?;
        Some(self.restart(key))
    }

    /// Drop everything and load the current key again.
    pub fn reload(&mut self) -> Option<PageRequest> {
        let key = self.key()?;
        Some(self.restart(key))
    }

    fn restart(&mut self, key: SeriesKey) -> PageRequest {
        self.series.clear();
        self.viewport.reset_to_tail();
        self.sync.reset();
        let epoch = self.pages.reset();
        self.pages.claim(0);
        tracing::debug!(key = %key, epoch, "Chart reset");
        PageRequest {
            limit: self.config.initial_count(key.interval),
            key,
            epoch,
            offset: 0,
        }
    }

    fn is_current(&self, req: &PageRequest) -> bool {
        self.pages.is_current(req.epoch) && self.key().as_ref() == Some(&req.key)
    }

    pub fn complete_initial(&mut self, req: &PageRequest, candles: Vec<Candle>) -> LoadOutcome {
        if !self.is_current(req) {
            tracing::debug!(key = %req.key, epoch = req.epoch, "Discarding stale initial page");
            return LoadOutcome::Stale;
        }
        self.pages.complete(candles.len());
        if candles.is_empty() {
            self.series.clear();
            return LoadOutcome::Exhausted;
        }
        self.series = CandleSeries::from_unsorted(candles);
        self.viewport.reset_to_tail();
        LoadOutcome::Loaded {
            inserted: self.series.len(),
            preserved: None,
        }
    }

    /// Report the visible range of a pane. Returns the write to mirror onto
    /// the other pane, if any.
    pub fn on_visible_range_changed(&mut self, pane: Pane, range: LogicalRange) -> Option<Mirror> {
        if pane == Pane::Price {
            self.viewport.set_range(range);
        }
        self.sync.on_range_changed(pane, range)
    }

    pub fn is_near_start(&self, range: &LogicalRange) -> bool {
        range.from < self.config.near_start_threshold
    }

    /// Ask for the next older page. `None` when there is nothing loaded yet,
    /// history ran out, or this offset is already in flight.
    pub fn on_visible_range_near_start(&mut self) -> Option<PageRequest> {
        let key = self.key()?;
        if self.series.is_empty() {
            return None;
        }
        let offset = u32::try_from(self.series.len()).ok()?;
        if !self.pages.claim(offset) {
            tracing::debug!(key = %key, offset, "Load-more suppressed");
            return None;
        }
        Some(PageRequest {
            limit: self.config.load_more_count(key.interval),
            key,
            epoch: self.pages.epoch(),
            offset,
        })
    }

    pub fn complete_load_more(&mut self, req: &PageRequest, candles: Vec<Candle>) -> LoadOutcome {
        if !self.is_current(req) {
            tracing::debug!(
                key = %req.key,
                epoch = req.epoch,
                offset = req.offset,
                "Discarding stale page"
            );
            return LoadOutcome::Stale;
        }
        if candles.is_empty() {
            self.pages.complete(0);
            tracing::debug!(key = %req.key, offset = req.offset, "History exhausted");
            return LoadOutcome::Exhausted;
        }
        self.viewport.before_prepend();
        let inserted = self.series.prepend_page(candles);
        let preserved = self.viewport.after_prepend(inserted, self.series.len());
        // A page with nothing older than the head would be requested at the
        // same offset forever.
        self.pages.complete(inserted);
        if inserted == 0 {
            tracing::warn!(
                key = %req.key,
                offset = req.offset,
                "Page held no candles older than the loaded series, treating history as exhausted"
            );
            return LoadOutcome::Exhausted;
        }
        LoadOutcome::Loaded {
            inserted,
            preserved,
        }
    }

    /// Hand back the candles for `req`, initial or load-more.
    pub fn complete(&mut self, req: &PageRequest, candles: Vec<Candle>) -> LoadOutcome {
        if req.is_initial() {
            self.complete_initial(req, candles)
        } else {
            self.complete_load_more(req, candles)
        }
    }

    /// A fetch for `req` failed. Its offset becomes requestable again.
    pub fn fail(&mut self, req: &PageRequest) {
        if self.is_current(req) {
            self.pages.release(req.offset);
        }
    }

    pub fn apply_live_candle(&mut self, candle: Candle) -> LiveMerge {
        if self.ticker.is_none() {
            return LiveMerge::Ignored;
        }
        self.series.merge_live(candle)
    }

    /// Fold a trade into the bar its timestamp falls in.
    pub fn apply_tick(&mut self, tick: LiveTick) -> LiveMerge {
        if self.ticker.is_none() {
            return LiveMerge::Ignored;
        }
        let bucket = self.interval.bucket_start(tick.timestamp);
        match self.series.last_mut() {
            Some(last) if last.timestamp == bucket => {
                last.absorb(&tick);
                LiveMerge::Replaced
            }
            Some(last) if last.timestamp > bucket => LiveMerge::Ignored,
            _ => self.series.merge_live(Candle::open_with(bucket, &tick)),
        }
    }

    pub fn frame(&self) -> ChartFrame {
        describe(&self.series, &self.viewport, &self.config.indicators)
    }

    /// Mapper for the price pane at the given pixel size.
    pub fn mapper(&self, width: f64, height: f64) -> Option<CoordinateMapper<'_>> {
        let frame_range = self.viewport.range()?;
        let window = frame_range
            .index_span(self.series.len())
            .map(|(s, e)| &self.series.as_slice()[s..=e])?;
        let (min, max) = window.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        });
        Some(CoordinateMapper {
            range: frame_range,
            width,
            height,
            price_min: min,
            price_max: max,
            interval_ms: self.interval.millis(),
            candles: self.series.as_slice(),
        })
    }
}

/// What a range report did.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeUpdate {
    pub mirror: Option<Mirror>,
    pub loaded: Option<LoadOutcome>,
}

/// Async driver: fetches the controller's page requests from a source.
pub struct ChartLoader<S: CandleSource> {
    source: S,
    controller: ChartController,
}

impl<S: CandleSource> ChartLoader<S> {
    pub fn new(source: S, config: ChartConfig) -> Self {
        Self {
            source,
            controller: ChartController::new(config),
        }
    }

    pub fn controller(&self) -> &ChartController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ChartController {
        &mut self.controller
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn set_ticker(&mut self, ticker: Ticker) -> Result<LoadOutcome, SdkError> {
        let req = self.controller.set_ticker(ticker);
        self.run_initial(req).await
    }

    pub async fn set_interval(&mut self, interval: Interval) -> Result<Option<LoadOutcome>, SdkError> {
        match self.controller.set_interval(interval) {
            Some(req) => self.run_initial(req).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn reload(&mut self) -> Result<Option<LoadOutcome>, SdkError> {
        match self.controller.reload() {
            Some(req) => self.run_initial(req).await.map(Some),
            None => Ok(None),
        }
    }

    /// Load the next older page if one may be requested.
    pub async fn load_more(&mut self) -> Result<Option<LoadOutcome>, SdkError> {
        let Some(req) = self.controller.on_visible_range_near_start() else {
            return Ok(None);
        };
        let candles = self.fetch(&req).await?;
        Ok(Some(self.controller.complete(&req, candles)))
    }

    /// Report a pane's range; loads more when the price pane nears the start.
    pub async fn on_visible_range_changed(
        &mut self,
        pane: Pane,
        range: LogicalRange,
    ) -> Result<RangeUpdate, SdkError> {
        let mirror = self.controller.on_visible_range_changed(pane, range);
        let loaded = if pane == Pane::Price && self.controller.is_near_start(&range) {
            self.load_more().await?
        } else {
            None
        };
        Ok(RangeUpdate { mirror, loaded })
    }

    async fn run_initial(&mut self, req: PageRequest) -> Result<LoadOutcome, SdkError> {
        let candles = self.fetch(&req).await?;
        Ok(self.controller.complete(&req, candles))
    }

    async fn fetch(&mut self, req: &PageRequest) -> Result<Vec<Candle>, SdkError> {
        let result = self
            .source
            .fetch_page(&req.key.ticker, req.key.interval, req.offset, req.limit)
            .await;
        match result {
            Ok(candles) => Ok(candles),
            Err(e) => {
                tracing::warn!(key = %req.key, offset = req.offset, error = %e, "Candle fetch failed");
                self.controller.fail(req);
                Err(SdkError::CandlePage {
                    series: req.key.to_string(),
                    offset: req.offset,
                    source: e,
                })
            }
        }
    }
}

impl<S: CandleSource> std::fmt::Debug for ChartLoader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartLoader")
            .field("controller", &self.controller)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::testing::FakeCandles;

    fn bar(ts: i64) -> Candle {
        Candle {
            timestamp: ts,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 1.0,
        }
    }

    fn minutes(range: std::ops::Range<i64>) -> Vec<Candle> {
        range.map(|i| bar(i * 60_000)).collect()
    }

    fn loaded(ctl: &mut ChartController, n: i64) -> PageRequest {
        let req = ctl.set_ticker(Ticker::from("AAPL"));
        ctl.complete_initial(&req, minutes(1000 - n..1000).into_iter().rev().collect());
        req
    }

    #[test]
    fn test_initial_request_uses_interval_counts() {
        let mut ctl = ChartController::default();
        assert_eq!(ctl.set_interval(Interval::Hour1), None);
        let req = ctl.set_ticker(Ticker::from("AAPL"));
        assert_eq!((req.offset, req.limit), (0, 200));

        let req = ctl.set_interval(Interval::Day1).unwrap();
        assert_eq!(req.limit, 150);
        assert_eq!(req.key.interval, Interval::Day1);
    }

    #[test]
    fn test_config_overrides_counts() {
        let mut ctl = ChartController::new(ChartConfig {
            initial_count: Some(42),
            load_more_count: Some(7),
            ..ChartConfig::default()
        });
        let req = ctl.set_ticker(Ticker::from("A"));
        assert_eq!(req.limit, 42);
        ctl.complete_initial(&req, minutes(0..42));
        assert_eq!(ctl.on_visible_range_near_start().unwrap().limit, 7);
    }

    #[test]
    fn test_initial_page_is_sorted() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 50);
        assert_eq!(ctl.series().len(), 50);
        assert!(ctl.series().is_strictly_ascending());
        assert!(ctl.viewport().follows_tail());
    }

    #[test]
    fn test_duplicate_offset_refused_until_failure() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 500);
        let first = ctl.on_visible_range_near_start().unwrap();
        assert_eq!((first.offset, first.limit), (500, 200));
        assert!(ctl.on_visible_range_near_start().is_none());

        ctl.fail(&first);
        assert_eq!(ctl.on_visible_range_near_start().unwrap().offset, 500);
    }

    #[test]
    fn test_stale_page_after_ticker_change() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 500);
        let old = ctl.on_visible_range_near_start().unwrap();

        let fresh = ctl.set_ticker(Ticker::from("MSFT"));
        assert_eq!(ctl.complete_load_more(&old, minutes(0..200)), LoadOutcome::Stale);
        assert!(ctl.series().is_empty());

        ctl.complete_initial(&fresh, minutes(0..10));
        assert_eq!(ctl.series().len(), 10);
        // A late failure of the old request must not free the new offset set.
        ctl.fail(&old);
        assert!(ctl.pagination().is_requested(0));
    }

    #[test]
    fn test_stale_across_same_key_reload() {
        let mut ctl = ChartController::default();
        let first = ctl.set_ticker(Ticker::from("A"));
        let _second = ctl.reload().unwrap();
        assert_eq!(ctl.complete_initial(&first, minutes(0..5)), LoadOutcome::Stale);
    }

    #[test]
    fn test_load_more_preserves_scroll() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 500);
        ctl.on_visible_range_changed(Pane::Price, LogicalRange::new(100.0, 150.0));

        let req = ctl.on_visible_range_near_start().unwrap();
        let page = minutes(1000 - 520..1000 - 500);
        let outcome = ctl.complete_load_more(&req, page);
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                inserted: 20,
                preserved: Some(LogicalRange::new(120.0, 170.0)),
            }
        );
        assert_eq!(ctl.viewport().range(), Some(LogicalRange::new(120.0, 170.0)));
        assert!(ctl.series().is_strictly_ascending());
    }

    #[test]
    fn test_empty_page_exhausts() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 10);
        let req = ctl.on_visible_range_near_start().unwrap();
        assert_eq!(ctl.complete_load_more(&req, vec![]), LoadOutcome::Exhausted);
        assert!(ctl.is_exhausted());
        assert!(ctl.on_visible_range_near_start().is_none());

        ctl.set_interval(Interval::Minute5);
        assert!(!ctl.is_exhausted());
    }

    #[test]
    fn test_overlapping_page_inserts_only_older() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 10);
        let req = ctl.on_visible_range_near_start().unwrap();
        let outcome = ctl.complete_load_more(&req, minutes(985..995));
        assert!(matches!(outcome, LoadOutcome::Loaded { inserted: 5, .. }));
        assert_eq!(ctl.series().len(), 15);
    }

    #[test]
    fn test_page_without_older_candles_exhausts() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 10);
        let req = ctl.on_visible_range_near_start().unwrap();
        // Every candle is already loaded.
        assert_eq!(ctl.complete_load_more(&req, minutes(990..1000)), LoadOutcome::Exhausted);
        assert!(ctl.is_exhausted());
        assert_eq!(ctl.series().len(), 10);
        assert!(ctl.on_visible_range_near_start().is_none());
    }

    #[test]
    fn test_complete_dispatches_on_offset() {
        let mut ctl = ChartController::default();
        let initial = ctl.set_ticker(Ticker::from("AAPL"));
        assert!(initial.is_initial());
        assert!(matches!(
            ctl.complete(&initial, minutes(990..1000)),
            LoadOutcome::Loaded { inserted: 10, .. }
        ));

        let more = ctl.on_visible_range_near_start().unwrap();
        assert!(!more.is_initial());
        assert!(matches!(
            ctl.complete(&more, minutes(980..990)),
            LoadOutcome::Loaded { inserted: 10, .. }
        ));
        assert_eq!(ctl.series().len(), 20);
    }

    #[test]
    fn test_apply_tick_buckets() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 2);
        let tail = ctl.series().last().unwrap().timestamp;

        let same = LiveTick {
            timestamp: tail + 30_000,
            price: 9.0,
            volume: 1.0,
        };
        assert_eq!(ctl.apply_tick(same), LiveMerge::Replaced);
        assert_eq!(ctl.series().last().unwrap().high, 9.0);

        let next = LiveTick {
            timestamp: tail + 61_000,
            price: 3.0,
            volume: 2.0,
        };
        assert_eq!(ctl.apply_tick(next), LiveMerge::Appended);
        let last = ctl.series().last().unwrap();
        assert_eq!((last.timestamp, last.open, last.volume), (tail + 60_000, 3.0, 2.0));

        let old = LiveTick {
            timestamp: tail - 1,
            price: 1.0,
            volume: 1.0,
        };
        assert_eq!(ctl.apply_tick(old), LiveMerge::Ignored);
    }

    #[test]
    fn test_live_candle_without_ticker_ignored() {
        let mut ctl = ChartController::default();
        assert_eq!(ctl.apply_live_candle(bar(0)), LiveMerge::Ignored);
    }

    #[test]
    fn test_range_change_mirrors_to_volume() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 10);
        let r = LogicalRange::new(2.0, 8.0);
        let m = ctl.on_visible_range_changed(Pane::Price, r).unwrap();
        assert_eq!(m.target, Pane::Volume);
        assert!(ctl.on_visible_range_changed(Pane::Volume, r).is_none());
        assert_eq!(ctl.frame().visible, Some(r));
    }

    #[test]
    fn test_mapper_needs_range() {
        let mut ctl = ChartController::default();
        loaded(&mut ctl, 10);
        assert!(ctl.mapper(100.0, 100.0).is_none());
        ctl.on_visible_range_changed(Pane::Price, LogicalRange::new(0.0, 9.0));
        let m = ctl.mapper(900.0, 100.0).unwrap();
        assert_eq!((m.price_min, m.price_max), (0.5, 2.0));
    }

    #[tokio::test]
    async fn test_loader_fetches_and_loads_more() {
        let mut loader = ChartLoader::new(FakeCandles::minutes(300, 0), ChartConfig::default());
        let out = loader.set_ticker(Ticker::from("AAPL")).await.unwrap();
        assert_eq!(
            out,
            LoadOutcome::Loaded {
                inserted: 300,
                preserved: None
            }
        );

        let update = loader
            .on_visible_range_changed(Pane::Price, LogicalRange::new(10.0, 60.0))
            .await
            .unwrap();
        assert_eq!(update.mirror.map(|m| m.target), Some(Pane::Volume));
        assert_eq!(update.loaded, Some(LoadOutcome::Exhausted));

        let calls = loader.source().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[1].2, calls[1].3), (300, 200));
    }
}
