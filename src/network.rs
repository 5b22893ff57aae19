//! Network URL constants.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.marketfeed.dev";

/// Default WebSocket URL.
pub const DEFAULT_WS_URL: &str = "wss://stream.marketfeed.dev/ws";
