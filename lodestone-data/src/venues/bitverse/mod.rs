use crate::config::{
    ApiConfig, DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_MAX_READ_ERROR_COUNT,
    DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH, DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION,
    DEFAULT_POST_CONNECTION_TIMEOUT_MS, DEFAULT_READ_BUFFER_SIZE, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_RECONNECTION_TIMEOUT_MS, DEFAULT_WRITE_BUFFER_SIZE, DEFAULT_WRITE_INTERVAL_MS,
    DEFAULT_WRITE_TIMEOUT_MS, Endpoint, WebSocketConfig,
};

/// Bitverse price API handler.
pub mod api;

/// Bitverse websocket message types.
pub mod messages;

/// Bitverse price WebSocket handler.
pub mod ws;

pub use api::BitverseApiHandler;
pub use ws::BitverseWsHandler;

/// Name of the Bitverse API price provider.
pub const API_NAME: &str = "bitverse_api";

/// Name of the Bitverse WebSocket price provider.
pub const WS_NAME: &str = "bitverse_ws";

/// Market ticker endpoint template. The venue symbol is substituted for `%s`.
pub const API_URL: &str = "https://market.bitverse.zone/api/v1/market/ticker?symbol=%s";

/// Testnet variant of [`API_URL`].
pub const API_URL_TESTNET: &str =
    "https://market.testnet.bitverse.zone/api/v1/market/ticker?symbol=%s";

/// Public Bitverse Websocket URL.
pub const WS_URL: &str = "wss://public-stream.bitverse.zone";

/// Bitverse expects an application-level ping every 15s.
pub const PING_INTERVAL_MS: u64 = 15_000;

/// Default configuration for the Bitverse API.
pub fn default_api_config() -> ApiConfig {
    ApiConfig {
        name: API_NAME.into(),
        enabled: true,
        atomic: true,
        timeout_ms: 3_000,
        interval_ms: 600,
        reconnect_timeout_ms: 2_000,
        max_queries: 1,
        endpoints: vec![Endpoint::new(API_URL), Endpoint::new(API_URL_TESTNET)],
    }
}

/// Default configuration for the Bitverse Websocket.
pub fn default_websocket_config() -> WebSocketConfig {
    WebSocketConfig {
        name: WS_NAME.into(),
        enabled: true,
        endpoints: vec![Endpoint::new(WS_URL)],
        read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
        handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        ping_interval_ms: PING_INTERVAL_MS,
        write_interval_ms: DEFAULT_WRITE_INTERVAL_MS,
        max_read_error_count: DEFAULT_MAX_READ_ERROR_COUNT,
        max_subscriptions_per_connection: DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION,
        max_subscriptions_per_batch: DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH,
        reconnection_timeout_ms: DEFAULT_RECONNECTION_TIMEOUT_MS,
        post_connection_timeout_ms: DEFAULT_POST_CONNECTION_TIMEOUT_MS,
        max_buffer_size: 1000,
        enable_compression: false,
    }
}
