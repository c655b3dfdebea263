use crate::{
    config::{
        DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_MAX_READ_ERROR_COUNT,
        DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH, DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION,
        DEFAULT_POST_CONNECTION_TIMEOUT_MS, DEFAULT_READ_BUFFER_SIZE,
        DEFAULT_READ_TIMEOUT_MS, DEFAULT_RECONNECTION_TIMEOUT_MS, DEFAULT_WRITE_BUFFER_SIZE,
        DEFAULT_WRITE_TIMEOUT_MS, Endpoint, WebSocketConfig,
    },
    error::{DataError, ErrorCode, ProviderError},
    handler::{HandledFrame, PriceWsHandler},
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::{ProviderTicker, ProviderTickerCache},
};
use chrono::{DateTime, Utc};
use lodestone_integration::protocol::websocket::WsMessage;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

/// Bitget websocket message types.
pub mod messages;

use messages::{EventMessage, SubscriptionTopic, TickersMessage};

/// Name of the Bitget provider.
pub const NAME: &str = "bitget_ws";

/// Public Bitget v2 Websocket URL.
pub const URL: &str = "wss://ws.bitget.com/v2/ws/public";

/// Bitget caps the number of messages written to one connection per second, so
/// subscription batches are spaced well apart.
pub const WRITE_INTERVAL_MS: u64 = 3_000;

/// Bitget drops connections that stay silent for 30s; ping ahead of that.
pub const PING_INTERVAL_MS: u64 = 25_000;

/// Default configuration for the Bitget Websocket.
pub fn default_websocket_config() -> WebSocketConfig {
    WebSocketConfig {
        name: NAME.into(),
        enabled: true,
        endpoints: vec![Endpoint::new(URL)],
        read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
        handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        ping_interval_ms: PING_INTERVAL_MS,
        write_interval_ms: WRITE_INTERVAL_MS,
        max_read_error_count: DEFAULT_MAX_READ_ERROR_COUNT,
        max_subscriptions_per_connection: DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION,
        max_subscriptions_per_batch: DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH,
        reconnection_timeout_ms: DEFAULT_RECONNECTION_TIMEOUT_MS,
        post_connection_timeout_ms: DEFAULT_POST_CONNECTION_TIMEOUT_MS,
        max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        enable_compression: false,
    }
}

/// [`PriceWsHandler`] for the Bitget v2 public tickers channel.
#[derive(Debug)]
pub struct BitgetWsHandler {
    ws: WebSocketConfig,
    cache: ProviderTickerCache,
}

impl BitgetWsHandler {
    pub fn new(ws: WebSocketConfig) -> Result<Self, DataError> {
        if ws.name != NAME {
            return Err(DataError::config(
                NAME,
                format!("expected websocket config name {NAME}, got {}", ws.name),
            ));
        }
        if !ws.enabled {
            return Err(DataError::config(NAME, "websocket config is not enabled"));
        }
        ws.validate()?;

        Ok(Self {
            ws,
            cache: ProviderTickerCache::new(),
        })
    }

    fn parse_tickers_message(&self, message: TickersMessage) -> PriceResponse {
        let mut resolved = ResolvedPrices::default();
        let mut unresolved = UnresolvedPrices::default();

        let time = DateTime::<Utc>::from_timestamp_millis(message.ts as i64)
            .unwrap_or_else(Utc::now);

        for data in message.data {
            let Some(ticker) = self.cache.from_off_chain_ticker(&data.inst_id) else {
                debug!(instrument = %data.inst_id, "ticker not found for instrument id");
                continue;
            };

            match Decimal::from_str(&data.last_pr) {
                Ok(price) => {
                    resolved.insert(ticker, PriceResult::new(price, time));
                }
                Err(error) => {
                    unresolved.insert(
                        ticker,
                        ProviderError::new(ErrorCode::FailedToParsePrice, error.to_string()),
                    );
                }
            }
        }

        PriceResponse::new(resolved, unresolved)
    }
}

impl PriceWsHandler for BitgetWsHandler {
    fn create_messages(
        &mut self,
        tickers: &[ProviderTicker],
    ) -> Result<Vec<WsMessage>, ProviderError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let topics: Vec<SubscriptionTopic> = tickers
            .iter()
            .map(|ticker| {
                self.cache.add(ticker.clone());
                SubscriptionTopic::spot_ticker(ticker.off_chain_ticker().as_str())
            })
            .collect();

        messages::subscribe_messages(&topics, self.ws.max_subscriptions_per_batch)
    }

    fn handle_message(&mut self, payload: &str) -> Result<HandledFrame, ProviderError> {
        if payload == messages::PONG {
            return Ok(HandledFrame::empty());
        }

        if let Ok(message) = serde_json::from_str::<TickersMessage>(payload) {
            return Ok(HandledFrame::response(self.parse_tickers_message(message)));
        }

        if let Ok(event) = serde_json::from_str::<EventMessage>(payload) {
            match event.event.as_str() {
                messages::EVENT_SUBSCRIBE => {
                    debug!("successfully subscribed to channel");
                    return Ok(HandledFrame::empty());
                }
                messages::EVENT_ERROR => {
                    warn!(
                        code = event.code.as_deref().unwrap_or(""),
                        msg = event.msg.as_deref().unwrap_or(""),
                        "venue rejected a request"
                    );
                    return Ok(HandledFrame::empty());
                }
                _ => {}
            }
        }

        Err(ProviderError::new(
            ErrorCode::FailedToDecode,
            "unclassifiable message",
        ))
    }

    fn heartbeat_messages(&self) -> Vec<WsMessage> {
        vec![WsMessage::text(messages::PING)]
    }

    fn fresh(&self) -> Box<dyn PriceWsHandler> {
        Box::new(Self {
            ws: self.ws.clone(),
            cache: ProviderTickerCache::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn handler_with_cache() -> BitgetWsHandler {
        let mut handler = BitgetWsHandler::new(default_websocket_config()).unwrap();
        handler
            .create_messages(&[ProviderTicker::new("BTC/USD", "BTCUSDT", "")])
            .unwrap();
        handler
    }

    #[test]
    fn test_handle_ticker_update() {
        let mut handler = handler_with_cache();
        let payload = r#"{
            "action": "snapshot",
            "arg": {"channel": "ticker", "instId": "BTCUSDT", "instType": "SPOT"},
            "data": [{"instId": "BTCUSDT", "lastPr": "42000.5"}],
            "ts": 1700000000000
        }"#;

        let handled = handler.handle_message(payload).unwrap();
        let response = handled.response.expect("ticker update carries prices");
        assert_eq!(response.resolved.len(), 1);
        let result = response.resolved.values().next().unwrap();
        assert_eq!(result.price, dec!(42000.5));
    }

    #[test]
    fn test_handle_subscribe_ack_and_pong() {
        let mut handler = handler_with_cache();

        let ack = r#"{"event": "subscribe", "arg": {"channel": "ticker", "instId": "BTCUSDT", "instType": "SPOT"}}"#;
        let handled = handler.handle_message(ack).unwrap();
        assert!(handled.response.is_none());
        assert!(handled.replies.is_empty());

        let handled = handler.handle_message(messages::PONG).unwrap();
        assert!(handled.response.is_none());
    }

    #[test]
    fn test_handle_unknown_instrument_is_skipped() {
        let mut handler = handler_with_cache();
        let payload = r#"{
            "action": "snapshot",
            "arg": {"channel": "ticker", "instId": "DOGEUSDT", "instType": "SPOT"},
            "data": [{"instId": "DOGEUSDT", "lastPr": "0.1"}],
            "ts": 1700000000000
        }"#;

        let handled = handler.handle_message(payload).unwrap();
        let response = handled.response.unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn test_unclassifiable_message_errors() {
        let mut handler = handler_with_cache();
        assert!(handler.handle_message(r#"{"op":"mystery"}"#).is_err());
    }
}
