//! Error types, one enum per layer, folded into [`SdkError`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The one-shot snapshot that opens a feed could not be fetched.
    ///
    /// No subscription was attempted and nothing is retried.
    #[error("Snapshot fetch failed for {topic}: {source}")]
    Snapshot {
        topic: String,
        #[source]
        source: HttpError,
    },

    /// A history page failed. Its offset was released and may be requested again.
    #[error("Candle page {series} @{offset} failed: {source}")]
    CandlePage {
        series: String,
        offset: u32,
        #[source]
        source: HttpError,
    },

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Timeout")]
    Timeout,

    #[error("Gave up after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

#[derive(Error, Debug)]
pub enum WsError {
    /// No transport is bound, or its command channel is gone.
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The session's credential expired; it cannot open a connection.
    #[error("Session {0} has expired")]
    Expired(String),
}
