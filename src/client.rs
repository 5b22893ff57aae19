//! High-level client: `FeedClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder, the shared connection manager, and the
//! entry points for live feeds and charts.

use crate::chart::ChartLoader;
use crate::config::FeedConfig;
use crate::domain::asset::client::Assets;
use crate::domain::candle::client::Candles;
use crate::domain::orderbook::client::Orderbooks;
use crate::domain::price::client::Prices;
use crate::domain::ranking::client::Rankings;
use crate::error::SdkError;
use crate::http::FeedHttp;
use crate::stream::{ConnectionManager, MarketFeeds, Session, SessionId, StreamHub};
use crate::ws::Connector;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub use crate::domain::asset::client::Assets as AssetsClient;
pub use crate::domain::candle::client::Candles as CandlesClient;
pub use crate::domain::orderbook::client::Orderbooks as OrderbooksClient;
pub use crate::domain::price::client::Prices as PricesClient;
pub use crate::domain::ranking::client::Rankings as RankingsClient;

/// The primary entry point.
///
/// One-shot REST reads go through the sub-clients (`client.prices()`, ...).
/// Live feeds are scoped to a [`Session`]: `client.streams(session)`.
#[derive(Clone)]
pub struct FeedClient {
    pub(crate) http: FeedHttp,
    pub(crate) config: FeedConfig,
    pub(crate) connections: Arc<ConnectionManager>,
    /// One hub per session id, so all feeds of a session share a multiplexer.
    pub(crate) hubs: Arc<Mutex<HashMap<SessionId, StreamHub>>>,
}

impl FeedClient {
    pub fn builder() -> FeedClientBuilder {
        FeedClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn prices(&self) -> Prices<'_> {
        Prices { client: self }
    }

    pub fn orderbooks(&self) -> Orderbooks<'_> {
        Orderbooks { client: self }
    }

    pub fn rankings(&self) -> Rankings<'_> {
        Rankings { client: self }
    }

    pub fn assets(&self) -> Assets<'_> {
        Assets { client: self }
    }

    pub fn candles(&self) -> Candles<'_> {
        Candles { client: self }
    }

    // ── Live data ────────────────────────────────────────────────────────

    /// Live feeds for `session`. Calls for the same session id share one
    /// hub and one connection. An expired session with no live subscriptions
    /// is replaced by the new one.
    pub fn streams(&self, session: Session) -> MarketFeeds {
        let hub = {
            let mut hubs = self.hubs.lock().unwrap_or_else(|e| e.into_inner());
            match hubs.get(&session.id) {
                Some(hub) if !hub.session().is_expired() || !hub.multiplexer().is_empty() => {
                    hub.clone()
                }
                _ => {
                    let hub = StreamHub::new(
                        self.connections.clone(),
                        session.clone(),
                        self.config.hub.clone(),
                    );
                    hubs.insert(session.id, hub.clone());
                    hub
                }
            }
        };
        MarketFeeds::new(hub, Arc::new(self.http.clone()))
    }

    /// Close the session's connection and forget its hub.
    pub fn end_session(&self, session: &SessionId) {
        let hub = self
            .hubs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session);
        match hub {
            Some(hub) => hub.end_session(),
            None => self.connections.end_session(session),
        }
    }

    /// A chart backed by the candle endpoint.
    pub fn chart(&self) -> ChartLoader<FeedHttp> {
        ChartLoader::new(self.http.clone(), self.config.chart.clone())
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn http(&self) -> &FeedHttp {
        &self.http
    }

    /// Bearer token sent with REST requests.
    pub async fn set_auth_token(&self, token: Option<String>) {
        self.http.set_auth_token(token).await;
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("api_url", &self.http.base_url())
            .field("ws_url", &self.config.ws.url)
            .field("connections", &self.connections.connection_count())
            .finish()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct FeedClientBuilder {
    config: FeedConfig,
    connector: Option<Arc<dyn Connector>>,
    auth_token: Option<String>,
}

impl FeedClientBuilder {
    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.api_url = url.to_string();
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.config.ws.url = url.to_string();
        self
    }

    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.config.ws.reconnect_delay_ms = ms;
        self
    }

    pub fn deactivate_grace_ms(mut self, ms: u64) -> Self {
        self.config.hub.deactivate_grace_ms = ms;
        self
    }

    /// Replace the default WebSocket transport.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn build(self) -> Result<FeedClient, SdkError> {
        self.config.validate()?;
        let connector = match self.connector {
            Some(connector) => connector,
            None => default_connector(&self.config)?,
        };
        let http = FeedHttp::new(&self.config.api_url)?
            .with_page_retry(self.config.page_retry.clone());
        let http = match self.auth_token {
            Some(token) => http.with_auth_token(token),
            None => http,
        };
        Ok(FeedClient {
            http,
            connections: Arc::new(ConnectionManager::new(connector)),
            hubs: Arc::new(Mutex::new(HashMap::new())),
            config: self.config,
        })
    }
}

#[cfg(feature = "ws-native")]
fn default_connector(config: &FeedConfig) -> Result<Arc<dyn Connector>, SdkError> {
    Ok(Arc::new(crate::ws::native::NativeConnector::new(config.ws.clone())))
}

#[cfg(not(feature = "ws-native"))]
fn default_connector(_config: &FeedConfig) -> Result<Arc<dyn Connector>, SdkError> {
    Err(SdkError::Validation(
        "no WebSocket transport: enable `ws-native` or pass a connector".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::UserId;
    use crate::stream::testing::FakeConnector;
    use crate::stream::{Credential, SessionId};

    fn client(connector: Arc<FakeConnector>) -> FeedClient {
        FeedClient::builder()
            .base_url("http://127.0.0.1:1/")
            .connector(connector)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_applies_overrides() {
        let c = FeedClient::builder()
            .base_url("http://localhost:9000/")
            .ws_url("ws://localhost:9001")
            .reconnect_delay_ms(250)
            .deactivate_grace_ms(1_000)
            .connector(Arc::new(FakeConnector::default()))
            .auth_token("tok")
            .build()
            .unwrap();
        assert_eq!(c.http().base_url(), "http://localhost:9000");
        assert_eq!(c.config().ws.url, "ws://localhost:9001");
        assert_eq!(c.config().ws.reconnect_delay_ms, 250);
        assert_eq!(c.config().hub.deactivate_grace_ms, 1_000);
    }

    #[test]
    fn test_builder_rejects_empty_url() {
        let err = FeedClient::builder()
            .base_url("")
            .connector(Arc::new(FakeConnector::default()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation(_)));
    }

    #[tokio::test]
    async fn test_streams_for_same_session_share_connection() {
        let connector = Arc::new(FakeConnector::default());
        let c = client(connector.clone());
        let session = Session::new(SessionId::new("s"), UserId::from("u"), Credential::new("t"));

        let a = c.streams(session.clone());
        let b = c.streams(session);
        let noop = || Arc::new(|_: &crate::domain::Update| {});
        let _x = a
            .hub()
            .subscribe(crate::ws::Topic::Price("AAPL".into()), noop())
            .unwrap();
        let _y = b
            .hub()
            .subscribe(crate::ws::Topic::Price("MSFT".into()), noop())
            .unwrap();

        assert_eq!(connector.open_count(), 1);
        assert_eq!(c.connections().connection_count(), 1);
        assert_eq!(a.hub().active_topics().len(), 2);

        c.end_session(&SessionId::new("s"));
        assert_eq!(c.connections().connection_count(), 0);
        assert!(connector.last().0.is_closed());
    }

    #[tokio::test]
    async fn test_snapshot_error_maps_to_topic() {
        let c = client(Arc::new(FakeConnector::default()));
        let err = c.prices().snapshot(&"AAPL".into()).await.unwrap_err();
        assert!(matches!(err, SdkError::Snapshot { ref topic, .. } if topic == "price:AAPL"));
    }
}
