//! Retry rules for GET requests.
//!
//! Snapshots go out once. Candle pages are retried with capped exponential
//! backoff, since a chart that fails to scroll back is worse than a slow one.

use crate::error::HttpError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a GET is retried.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RetryPolicy {
    /// One attempt; the error goes straight back to the caller.
    #[default]
    Once,
    Backoff(RetryConfig),
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    GiveUp,
    RetryAfter(Duration),
}

/// Backoff settings, loadable from the `page_retry` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Random spread applied to each delay, as a percentage either side.
    pub jitter_pct: u8,
    /// Statuses worth another try. 429 here also enables `Retry-After`.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter_pct: 25,
            retry_statuses: vec![429, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Classify `err` from attempt number `attempt` (0 is the first request).
    pub fn decide(&self, err: &HttpError, attempt: u32) -> RetryDecision {
        if attempt >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        let retryable = match err {
            HttpError::ServerError { status, .. } => self.retry_statuses.contains(status),
            HttpError::RateLimited { retry_after_ms } => {
                if !self.retry_statuses.contains(&429) {
                    return RetryDecision::GiveUp;
                }
                if let Some(ms) = retry_after_ms {
                    let hinted = Duration::from_millis(*ms).min(self.max_delay());
                    return RetryDecision::RetryAfter(hinted.max(self.backoff(attempt)));
                }
                true
            }
            HttpError::Timeout => true,
            #[cfg(feature = "http")]
            HttpError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        };
        if retryable {
            RetryDecision::RetryAfter(self.jittered(self.backoff(attempt)))
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Un-jittered delay before retry `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_pct == 0 {
            return delay;
        }
        let spread = f64::from(self.jitter_pct.min(100)) / 100.0;
        let scale = 1.0 + spread * (rand::random::<f64>() * 2.0 - 1.0);
        delay.mul_f64(scale).min(self.max_delay())
    }
}
