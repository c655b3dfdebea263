use crate::config::{
    ApiConfig, DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_MAX_BUFFER_SIZE,
    DEFAULT_MAX_READ_ERROR_COUNT, DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH,
    DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION, DEFAULT_PING_INTERVAL_MS,
    DEFAULT_POST_CONNECTION_TIMEOUT_MS, DEFAULT_READ_BUFFER_SIZE, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_RECONNECTION_TIMEOUT_MS, DEFAULT_WRITE_BUFFER_SIZE, DEFAULT_WRITE_INTERVAL_MS,
    DEFAULT_WRITE_TIMEOUT_MS, Endpoint, WebSocketConfig,
};

/// Bitmart price API handler.
pub mod api;

/// Bitmart websocket message types.
pub mod messages;

/// Bitmart price WebSocket handler.
pub mod ws;

pub use api::BitmartApiHandler;
pub use ws::BitmartWsHandler;

/// Name of the Bitmart API price provider.
pub const API_NAME: &str = "bitmart_api";

/// Name of the Bitmart WebSocket price provider.
pub const WS_NAME: &str = "bitmart_ws";

/// Spot ticker endpoint template. The venue symbol is substituted for `%s`.
pub const API_URL: &str = "https://api-cloud.bitmart.com/spot/quotation/v3/ticker?symbol=%s";

/// Public Bitmart Websocket URL.
pub const WS_URL: &str = "wss://ws-manager-compress.bitmart.com/api?protocol=1.1";

/// Default configuration for the Bitmart API.
pub fn default_api_config() -> ApiConfig {
    ApiConfig {
        name: API_NAME.into(),
        enabled: true,
        atomic: true,
        timeout_ms: 3_000,
        interval_ms: 750,
        reconnect_timeout_ms: 2_000,
        max_queries: 1,
        endpoints: vec![Endpoint::new(API_URL)],
    }
}

/// Default configuration for the Bitmart Websocket.
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
        ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
        write_interval_ms: DEFAULT_WRITE_INTERVAL_MS,
        max_read_error_count: DEFAULT_MAX_READ_ERROR_COUNT,
        max_subscriptions_per_connection: DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION,
        max_subscriptions_per_batch: DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH,
        reconnection_timeout_ms: DEFAULT_RECONNECTION_TIMEOUT_MS,
        post_connection_timeout_ms: DEFAULT_POST_CONNECTION_TIMEOUT_MS,
        max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        enable_compression: false,
    }
}
