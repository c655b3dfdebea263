use crate::error::DataError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::time::Duration;

/// Default number of buffered [`PriceResponse`](crate::response::PriceResponse)s between a
/// connector and its provider's merger task.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024;

/// Default wait between a dropped WebSocket connection and the next dial attempt.
pub const DEFAULT_RECONNECTION_TIMEOUT_MS: u64 = 10_000;

/// Default settle time between completing a WebSocket handshake and sending subscriptions.
pub const DEFAULT_POST_CONNECTION_TIMEOUT_MS: u64 = 500;

/// Default WebSocket handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// Default duration a WebSocket read may yield no bytes before the connection is
/// considered dead.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for a single WebSocket write.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

/// Default interval between heartbeat messages, for venues that use them.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 15_000;

/// Default spacing between consecutive subscription batches on one connection.
pub const DEFAULT_WRITE_INTERVAL_MS: u64 = 100;

/// Default number of consecutive read errors tolerated before reconnecting.
pub const DEFAULT_MAX_READ_ERROR_COUNT: usize = 100;

/// Default subscription capacity of a single WebSocket connection.
pub const DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION: usize = 40;

/// Default number of subscriptions bundled into one subscribe frame.
pub const DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH: usize = 20;

/// Default read/write socket buffer sizes.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 4096;

/// Single addressable endpoint of a venue.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Endpoint {
    pub url: String,
}

impl Endpoint {
    pub fn new<S>(url: S) -> Self
    where
        S: Into<String>,
    {
        Self { url: url.into() }
    }
}

/// Configuration for a request/response API connector.
///
/// Durations are millisecond fields with [`Duration`] accessors, so configs stay plain
/// serde data.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    pub name: SmolStr,
    pub enabled: bool,
    /// An atomic handler fetches exactly one ticker per HTTP call.
    pub atomic: bool,
    pub timeout_ms: u64,
    pub interval_ms: u64,
    /// Backoff applied after a tick in which every request failed at the transport level.
    pub reconnect_timeout_ms: u64,
    /// Maximum tickers per request for non-atomic handlers.
    pub max_queries: usize,
    pub endpoints: Vec<Endpoint>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn reconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.reconnect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.name.is_empty() {
            return Err(DataError::config("api", "name is empty"));
        }
        if self.endpoints.is_empty() {
            return Err(DataError::config(&self.name, "no endpoints configured"));
        }
        if self.timeout_ms == 0 || self.interval_ms == 0 || self.reconnect_timeout_ms == 0 {
            return Err(DataError::config(
                &self.name,
                "timeout, interval and reconnect timeout must be non-zero",
            ));
        }
        if self.max_queries == 0 {
            return Err(DataError::config(&self.name, "max queries must be at least 1"));
        }

        Ok(())
    }
}

/// Configuration for a persistent WebSocket connector.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct WebSocketConfig {
    pub name: SmolStr,
    pub enabled: bool,
    pub endpoints: Vec<Endpoint>,
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    pub handshake_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub ping_interval_ms: u64,
    pub write_interval_ms: u64,
    pub max_read_error_count: usize,
    pub max_subscriptions_per_connection: usize,
    pub max_subscriptions_per_batch: usize,
    pub reconnection_timeout_ms: u64,
    pub post_connection_timeout_ms: u64,
    /// Capacity of the connector -> provider result channel.
    pub max_buffer_size: usize,
    /// Compression is not supported by the underlying transport; enabling it logs a
    /// warning at connection time and is otherwise ignored.
    pub enable_compression: bool,
}

impl WebSocketConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_millis(self.write_interval_ms)
    }

    pub fn reconnection_timeout(&self) -> Duration {
        Duration::from_millis(self.reconnection_timeout_ms)
    }

    pub fn post_connection_timeout(&self) -> Duration {
        Duration::from_millis(self.post_connection_timeout_ms)
    }

    /// Result channel capacity: at least twice the subscription capacity of one
    /// connection, so a slow merger cannot stall the read path.
    pub fn result_buffer(&self) -> usize {
        self.max_buffer_size
            .max(2 * self.max_subscriptions_per_connection)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.name.is_empty() {
            return Err(DataError::config("websocket", "name is empty"));
        }
        if self.endpoints.is_empty() {
            return Err(DataError::config(&self.name, "no endpoints configured"));
        }
        if self.handshake_timeout_ms == 0
            || self.read_timeout_ms == 0
            || self.write_timeout_ms == 0
            || self.ping_interval_ms == 0
            || self.write_interval_ms == 0
            || self.reconnection_timeout_ms == 0
        {
            return Err(DataError::config(&self.name, "timeouts must be non-zero"));
        }
        if self.max_read_error_count == 0 {
            return Err(DataError::config(
                &self.name,
                "max read error count must be at least 1",
            ));
        }
        if self.max_subscriptions_per_connection == 0 || self.max_subscriptions_per_batch == 0 {
            return Err(DataError::config(
                &self.name,
                "subscription limits must be at least 1",
            ));
        }
        if self.max_buffer_size == 0 {
            return Err(DataError::config(&self.name, "max buffer size must be at least 1"));
        }

        Ok(())
    }
}

/// Declares whether a venue feeds prices or market maps.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigKind {
    #[default]
    Price,
    MarketMap,
}

/// Per-venue configuration: a name, exactly one enabled transport, and the kind of data
/// the venue feeds.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct VenueConfig {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<WebSocketConfig>,
    #[serde(default, rename = "type")]
    pub kind: ConfigKind,
}

impl VenueConfig {
    /// Construct an API-transport venue config.
    pub fn api(name: &str, api: ApiConfig, kind: ConfigKind) -> Self {
        Self {
            name: SmolStr::new(name),
            api: Some(api),
            websocket: None,
            kind,
        }
    }

    /// Construct a WebSocket-transport venue config.
    pub fn websocket(name: &str, websocket: WebSocketConfig, kind: ConfigKind) -> Self {
        Self {
            name: SmolStr::new(name),
            api: None,
            websocket: Some(websocket),
            kind,
        }
    }

    pub fn api_enabled(&self) -> bool {
        self.api.as_ref().is_some_and(|api| api.enabled)
    }

    pub fn websocket_enabled(&self) -> bool {
        self.websocket.as_ref().is_some_and(|ws| ws.enabled)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.name.is_empty() {
            return Err(DataError::config("venue", "name is empty"));
        }

        match (self.api_enabled(), self.websocket_enabled()) {
            (true, true) => Err(DataError::config(
                &self.name,
                "api and websocket cannot both be enabled",
            )),
            (false, false) => Err(DataError::NoTransport(self.name.clone())),
            _ => {
                if let Some(api) = &self.api {
                    api.validate()?;
                }
                if let Some(websocket) = &self.websocket {
                    websocket.validate()?;
                }
                Ok(())
            }
        }
    }
}

/// Top-level configuration of the provider runtime.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct OracleConfig {
    pub venues: Vec<VenueConfig>,
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), DataError> {
        for venue in &self.venues {
            venue.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues;

    #[test]
    fn test_venue_config_exactly_one_transport() {
        let mut venue = VenueConfig::api(
            "bingx_api",
            venues::bingx::default_api_config(),
            ConfigKind::Price,
        );
        assert!(venue.validate().is_ok());

        // Disabling the only transport leaves the venue with none.
        venue.api.as_mut().unwrap().enabled = false;
        assert!(matches!(
            venue.validate(),
            Err(DataError::NoTransport(_))
        ));

        // Both transports enabled at once is also rejected.
        venue.api.as_mut().unwrap().enabled = true;
        venue.websocket = Some(venues::bitget::default_websocket_config());
        assert!(matches!(venue.validate(), Err(DataError::Config { .. })));
    }

    #[test]
    fn test_default_providers_all_validate() {
        let config = OracleConfig {
            venues: venues::default_providers(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_result_buffer_floor() {
        let mut ws = venues::bitget::default_websocket_config();
        ws.max_buffer_size = 1;
        ws.max_subscriptions_per_connection = 50;
        assert_eq!(ws.result_buffer(), 100);
    }
}
