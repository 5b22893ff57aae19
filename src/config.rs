//! Top-level configuration, loadable from JSON.
//!
//! Every section defaults, so a config file only names what it overrides.

use crate::chart::ChartConfig;
use crate::error::SdkError;
#[cfg(feature = "http")]
use crate::http::RetryConfig;
use crate::stream::HubConfig;
use crate::ws::WsConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub api_url: String,
    pub ws: WsConfig,
    pub hub: HubConfig,
    pub chart: ChartConfig,
    /// Backoff for candle page requests. Snapshots are never retried.
    #[cfg(feature = "http")]
    pub page_retry: RetryConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: crate::network::DEFAULT_API_URL.to_string(),
            ws: WsConfig::default(),
            hub: HubConfig::default(),
            chart: ChartConfig::default(),
            #[cfg(feature = "http")]
            page_retry: RetryConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn from_json(raw: &str) -> Result<Self, SdkError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SdkError> {
        if self.api_url.is_empty() {
            return Err(SdkError::Validation("api_url is empty".into()));
        }
        if self.ws.url.is_empty() {
            return Err(SdkError::Validation("ws.url is empty".into()));
        }
        if self.chart.initial_count == Some(0) || self.chart.load_more_count == Some(0) {
            return Err(SdkError::Validation("chart page counts must be positive".into()));
        }
        #[cfg(feature = "http")]
        if self.page_retry.max_delay_ms < self.page_retry.base_delay_ms {
            return Err(SdkError::Validation(
                "page_retry.max_delay_ms is below base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}
