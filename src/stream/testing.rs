//! In-crate fakes for the transport and data-source seams.

use crate::domain::asset::AssetValuation;
use crate::domain::candle::Candle;
use crate::domain::orderbook::OrderbookView;
use crate::domain::price::TickerPrice;
use crate::domain::ranking::RankingBoard;
use crate::domain::Snapshot;
use crate::error::{HttpError, WsError};
use crate::shared::{Interval, RankingMode, Ticker, UserId};
use crate::stream::source::{CandleSource, SnapshotSource};
use crate::ws::{ConnectionState, ConnectionStatus, Connector, MessageBus, MessageOut, Topic, WsEvent};
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Records every command instead of sending it.
pub(crate) struct FakeBus {
    pub sent: Mutex<Vec<(u64, MessageOut)>>,
    pub published: Mutex<Vec<(Topic, serde_json::Value)>>,
    pub closed: AtomicBool,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl Default for FakeBus {
    fn default() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus {
            state: ConnectionState::Open,
            ..ConnectionStatus::default()
        });
        Self {
            sent: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            status_tx,
        }
    }
}

impl FakeBus {
    pub fn sent_with_generation(&self) -> Vec<(u64, MessageOut)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subscribes(&self) -> Vec<Topic> {
        self.sent_with_generation()
            .into_iter()
            .filter_map(|(_, m)| match m {
                MessageOut::Subscribe { topic } => Some(topic),
                _ => None,
            })
            .collect()
    }

    pub fn unsubscribes(&self) -> Vec<Topic> {
        self.sent_with_generation()
            .into_iter()
            .filter_map(|(_, m)| match m {
                MessageOut::Unsubscribe { topic } => Some(topic),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MessageBus for FakeBus {
    fn send_wire(&self, generation: u64, msg: MessageOut) -> Result<(), WsError> {
        if self.is_closed() {
            return Err(WsError::NotConnected);
        }
        self.sent.lock().unwrap().push((generation, msg));
        Ok(())
    }

    fn publish(&self, topic: &Topic, payload: serde_json::Value) -> Result<(), WsError> {
        self.published.lock().unwrap().push((topic.clone(), payload));
        Ok(())
    }

    fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.status_tx.send_modify(|s| s.state = ConnectionState::Closed);
    }
}

/// Hands out [`FakeBus`]es and keeps the event senders for injection.
#[derive(Default)]
pub(crate) struct FakeConnector {
    pub opened: Mutex<Vec<(String, Arc<FakeBus>, mpsc::Sender<WsEvent>)>>,
}

impl FakeConnector {
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn last(&self) -> (Arc<FakeBus>, mpsc::Sender<WsEvent>) {
        let opened = self.opened.lock().unwrap();
        let (_, bus, tx) = opened.last().expect("no connection opened");
        (bus.clone(), tx.clone())
    }

    /// Drop every event sender so the pumps finish.
    pub fn hang_up(&self) {
        self.opened.lock().unwrap().clear();
    }
}

impl Connector for FakeConnector {
    fn open(
        &self,
        credential: &str,
    ) -> Result<(Arc<dyn MessageBus>, mpsc::Receiver<WsEvent>), WsError> {
        let bus = Arc::new(FakeBus::default());
        let (tx, rx) = mpsc::channel(64);
        self.opened
            .lock()
            .unwrap()
            .push((credential.to_string(), bus.clone(), tx));
        Ok((bus, rx))
    }
}

/// Let spawned tasks on the current-thread runtime run.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub(crate) fn ticker_price(ticker: &str, price: i64, timestamp: i64) -> TickerPrice {
    let price = Decimal::from(price);
    TickerPrice {
        ticker: Ticker::from(ticker),
        price,
        open_price: price,
        high: price,
        low: price,
        change: Decimal::ZERO,
        change_rate: 0.0,
        volume: Decimal::ZERO,
        trade_volume: Decimal::ONE,
        timestamp,
    }
}

/// Scripted snapshot results, consumed in order per domain.
#[derive(Default)]
pub(crate) struct FakeSource {
    pub prices: Mutex<VecDeque<Result<Snapshot<TickerPrice>, HttpError>>>,
    pub rankings: Mutex<VecDeque<Result<Snapshot<RankingBoard>, HttpError>>>,
    pub orderbooks: Mutex<VecDeque<Result<Snapshot<OrderbookView>, HttpError>>>,
    pub assets: Mutex<VecDeque<Result<Snapshot<AssetValuation>, HttpError>>>,
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, HttpError>>>) -> Result<T, HttpError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(HttpError::NotFound("no scripted snapshot".into())))
}

impl SnapshotSource for FakeSource {
    fn price(&self, _ticker: &Ticker) -> BoxFuture<'_, Result<Snapshot<TickerPrice>, HttpError>> {
        let r = next(&self.prices);
        Box::pin(async move { r })
    }

    fn orderbook(
        &self,
        _ticker: &Ticker,
    ) -> BoxFuture<'_, Result<Snapshot<OrderbookView>, HttpError>> {
        let r = next(&self.orderbooks);
        Box::pin(async move { r })
    }

    fn ranking(
        &self,
        _mode: RankingMode,
    ) -> BoxFuture<'_, Result<Snapshot<RankingBoard>, HttpError>> {
        let r = next(&self.rankings);
        Box::pin(async move { r })
    }

    fn asset(&self, _user: &UserId) -> BoxFuture<'_, Result<Snapshot<AssetValuation>, HttpError>> {
        let r = next(&self.assets);
        Box::pin(async move { r })
    }
}

/// Serves candles from a fixed newest-first history.
pub(crate) struct FakeCandles {
    /// Ascending.
    pub history: Vec<Candle>,
    pub calls: Mutex<Vec<(Ticker, Interval, u32, u32)>>,
}

impl FakeCandles {
    pub fn minutes(count: usize, start_ms: i64) -> Self {
        let history = (0..count)
            .map(|i| {
                let ts = start_ms + i as i64 * 60_000;
                let p = 100.0 + (i % 7) as f64;
                Candle {
                    timestamp: ts,
                    open: p,
                    high: p + 1.0,
                    low: p - 1.0,
                    close: p + 0.5,
                    volume: 10.0 + i as f64,
                }
            })
            .collect();
        Self {
            history,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl CandleSource for FakeCandles {
    fn fetch_page(
        &self,
        ticker: &Ticker,
        interval: Interval,
        offset: u32,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<Candle>, HttpError>> {
        self.calls
            .lock()
            .unwrap()
            .push((ticker.clone(), interval, offset, limit));
        let len = self.history.len();
        let end = len.saturating_sub(offset as usize);
        let start = end.saturating_sub(limit as usize);
        // Newest first, as the backend is free to return any order.
        let page: Vec<Candle> = self.history[start..end].iter().rev().copied().collect();
        Box::pin(async move { Ok(page) })
    }
}
