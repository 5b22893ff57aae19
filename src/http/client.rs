//! Low-level HTTP client: `FeedHttp`.
//!
//! One method per API endpoint. Returns wire types; conversion to domain
//! types happens in the domain sub-clients and the snapshot sources.

use crate::domain::asset::wire::AssetWire;
use crate::domain::candle::wire::CandlesResponse;
use crate::domain::orderbook::wire::OrderbookWire;
use crate::domain::price::wire::TickerPriceWire;
use crate::domain::ranking::wire::RankingWire;
use crate::domain::SnapshotEnvelope;
use crate::error::HttpError;
use crate::http::retry::{RetryConfig, RetryDecision, RetryPolicy};
use crate::shared::{Interval, RankingMode, Ticker, UserId};

use async_lock::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Low-level HTTP client for the market-data REST API.
#[derive(Clone)]
pub struct FeedHttp {
    base_url: String,
    client: Client,
    /// Bearer token. NEVER exposed publicly.
    auth_token: Arc<RwLock<Option<String>>>,
    page_retry: RetryPolicy,
}

impl FeedHttp {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth_token: Arc::new(RwLock::new(None)),
            page_retry: RetryPolicy::Backoff(RetryConfig::default()),
        })
    }

    /// Replace the backoff used for candle pages.
    pub fn with_page_retry(mut self, config: RetryConfig) -> Self {
        self.page_retry = RetryPolicy::Backoff(config);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Seed the bearer token before the client is shared.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Arc::new(RwLock::new(Some(token.into())));
        self
    }

    pub(crate) async fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().await = token;
    }

    // ── Snapshots ────────────────────────────────────────────────────────
    //
    // Snapshots are never retried: a failed snapshot is reported once and
    // the caller decides when to refresh.

    pub async fn get_ticker_snapshot(
        &self,
        ticker: &Ticker,
    ) -> Result<SnapshotEnvelope<TickerPriceWire>, HttpError> {
        let url = format!(
            "{}/api/tickers/{}/snapshot",
            self.base_url,
            urlencoding::encode(ticker.as_str())
        );
        self.get(&url, &RetryPolicy::Once).await
    }

    pub async fn get_orderbook(
        &self,
        ticker: &Ticker,
    ) -> Result<SnapshotEnvelope<OrderbookWire>, HttpError> {
        let url = format!(
            "{}/api/orderbooks/{}",
            self.base_url,
            urlencoding::encode(ticker.as_str())
        );
        self.get(&url, &RetryPolicy::Once).await
    }

    pub async fn get_ranking(
        &self,
        mode: RankingMode,
    ) -> Result<SnapshotEnvelope<RankingWire>, HttpError> {
        let url = format!("{}/api/rankings/{}", self.base_url, mode.as_str());
        self.get(&url, &RetryPolicy::Once).await
    }

    pub async fn get_user_assets(
        &self,
        user: &UserId,
    ) -> Result<SnapshotEnvelope<AssetWire>, HttpError> {
        let url = format!(
            "{}/api/users/{}/assets",
            self.base_url,
            urlencoding::encode(user.as_str())
        );
        self.get(&url, &RetryPolicy::Once).await
    }

    // ── Candles ──────────────────────────────────────────────────────────

    pub async fn get_candles(
        &self,
        ticker: &Ticker,
        interval: Interval,
        offset: u32,
        limit: u32,
    ) -> Result<CandlesResponse, HttpError> {
        let url = candles_url(&self.base_url, ticker, interval, offset, limit);
        self.get(&url, &self.page_retry).await
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    /// GET with the given retry policy. Every endpoint of this API is a GET.
    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        retry: &RetryPolicy,
    ) -> Result<T, HttpError> {
        let config = match retry {
            RetryPolicy::Once => return self.do_get(url).await,
            RetryPolicy::Backoff(config) => config,
        };

        let mut attempt = 0;
        loop {
            let err = match self.do_get::<T>(url).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            match config.decide(&err, attempt) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!(
                        attempt = attempt + 1,
                        max = config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        %url,
                        error = %err,
                        "Retrying GET"
                    );
                    futures_timer::Delay::new(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp if attempt == 0 => return Err(err),
                RetryDecision::GiveUp => {
                    return Err(HttpError::MaxRetriesExceeded {
                        attempts: attempt + 1,
                        last_error: err.to_string(),
                    })
                }
            }
        }
    }

    async fn do_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let mut req = self.client.get(url);

        if let Some(token) = self.auth_token.read().await.as_ref() {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            let parsed = resp.json::<T>().await?;
            return Ok(parsed);
        }

        let status_code = status.as_u16();
        let retry_after_ms = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after_ms);
        let body_text = resp.text().await.unwrap_or_default();

        match status_code {
            401 => Err(HttpError::Unauthorized),
            404 => Err(HttpError::NotFound(body_text)),
            429 => Err(HttpError::RateLimited { retry_after_ms }),
            400..=499 => Err(HttpError::BadRequest(body_text)),
            _ => Err(HttpError::ServerError {
                status: status_code,
                body: body_text,
            }),
        }
    }
}

fn candles_url(base: &str, ticker: &Ticker, interval: Interval, offset: u32, limit: u32) -> String {
    format!(
        "{}/api/candles?ticker={}&interval={}&offset={}&limit={}",
        base,
        urlencoding::encode(ticker.as_str()),
        interval.as_str(),
        offset,
        limit
    )
}

/// `Retry-After` in delta-seconds form.
fn parse_retry_after_ms(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().map(|s| s * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candles_url() {
        let url = candles_url(
            "https://api.example.com",
            &Ticker::from("BRK B"),
            Interval::Minute5,
            400,
            150,
        );
        assert_eq!(
            url,
            "https://api.example.com/api/candles?ticker=BRK%20B&interval=5m&offset=400&limit=150"
        );
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let http = FeedHttp::new("https://api.example.com/").unwrap();
        assert_eq!(http.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after_ms("2"), Some(2000));
        assert_eq!(parse_retry_after_ms("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
