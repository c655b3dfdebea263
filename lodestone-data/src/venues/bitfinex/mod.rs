use crate::{
    config::{
        DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_MAX_READ_ERROR_COUNT,
        DEFAULT_MAX_SUBSCRIPTIONS_PER_BATCH, DEFAULT_MAX_SUBSCRIPTIONS_PER_CONNECTION,
        DEFAULT_PING_INTERVAL_MS, DEFAULT_POST_CONNECTION_TIMEOUT_MS, DEFAULT_READ_BUFFER_SIZE,
        DEFAULT_READ_TIMEOUT_MS, DEFAULT_RECONNECTION_TIMEOUT_MS, DEFAULT_WRITE_BUFFER_SIZE,
        DEFAULT_WRITE_INTERVAL_MS, DEFAULT_WRITE_TIMEOUT_MS, Endpoint, WebSocketConfig,
    },
    error::{DataError, ErrorCode, ProviderError},
    handler::{HandledFrame, PriceWsHandler},
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::{ProviderTicker, ProviderTickerCache},
};
use chrono::Utc;
use fnv::FnvHashMap;
use lodestone_integration::protocol::websocket::WsMessage;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Bitfinex websocket message types.
pub mod messages;

use messages::{EventMessage, StreamFrame, StreamPayload};

/// Name of the Bitfinex provider.
pub const NAME: &str = "bitfinex_ws";

/// Public Bitfinex v2 Websocket URL.
pub const URL: &str = "wss://api-pub.bitfinex.com/ws/2";

/// Default configuration for the Bitfinex Websocket.
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

/// [`PriceWsHandler`] for the Bitfinex v2 ticker channel.
///
/// Subscription confirmations carry a numeric channel id; subsequent updates for the pair
/// arrive keyed by that id alone, so the handler keeps a channel-id to ticker map built
/// from the confirmations. Confirmation order is not relied upon. Error events answer
/// with re-subscribe frames for every cached pair.
#[derive(Debug)]
pub struct BitfinexWsHandler {
    cache: ProviderTickerCache,
    channel_map: FnvHashMap<i64, ProviderTicker>,
}

impl BitfinexWsHandler {
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
            cache: ProviderTickerCache::new(),
            channel_map: FnvHashMap::default(),
        })
    }

    fn handle_stream_frame(&self, frame: StreamFrame) -> Result<HandledFrame, ProviderError> {
        let StreamFrame(chan_id, payload) = frame;

        match payload {
            StreamPayload::Heartbeat(payload) if payload == messages::HEARTBEAT => {
                Ok(HandledFrame::empty())
            }
            StreamPayload::Heartbeat(payload) => Err(ProviderError::new(
                ErrorCode::FailedToDecode,
                format!("unexpected stream payload {payload}"),
            )),
            StreamPayload::Ticker(fields) => {
                let Some(ticker) = self.channel_map.get(&chan_id) else {
                    debug!(chan_id, "update for unconfirmed channel");
                    return Ok(HandledFrame::empty());
                };

                let Some(last_price) = fields.get(messages::LAST_PRICE_INDEX) else {
                    return Err(ProviderError::new(
                        ErrorCode::InvalidResponse,
                        format!("ticker frame has {} fields", fields.len()),
                    ));
                };

                let mut resolved = ResolvedPrices::default();
                let mut unresolved = UnresolvedPrices::default();
                match Decimal::try_from(*last_price) {
                    Ok(price) => {
                        resolved.insert(ticker.clone(), PriceResult::new(price, Utc::now()));
                    }
                    Err(error) => {
                        unresolved.insert(
                            ticker.clone(),
                            ProviderError::new(ErrorCode::FailedToParsePrice, error.to_string()),
                        );
                    }
                }

                Ok(HandledFrame::response(PriceResponse::new(
                    resolved, unresolved,
                )))
            }
        }
    }

    fn handle_event(&mut self, event: EventMessage) -> Result<HandledFrame, ProviderError> {
        match event {
            EventMessage::Info { version } => {
                debug!(?version, "received connection banner");
                Ok(HandledFrame::empty())
            }
            EventMessage::Subscribed {
                channel,
                chan_id,
                pair,
            } => {
                if channel != messages::TICKER_CHANNEL {
                    return Err(ProviderError::new(
                        ErrorCode::InvalidResponse,
                        format!("subscribed to unexpected channel {channel}"),
                    ));
                }

                let Some(ticker) = self.cache.from_off_chain_ticker(&pair) else {
                    return Err(ProviderError::new(
                        ErrorCode::UnknownPair,
                        format!("confirmation for unknown pair {pair}"),
                    ));
                };

                debug!(%pair, chan_id, "successfully subscribed");
                self.channel_map.insert(chan_id, ticker);
                Ok(HandledFrame::empty())
            }
            EventMessage::Error { msg, code } => {
                warn!(%msg, code, "venue rejected a request, re-subscribing cached pairs");

                let replies = self
                    .cache
                    .snapshot()
                    .iter()
                    .map(|ticker| messages::subscribe_message(ticker.off_chain_ticker()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(HandledFrame::replies(replies))
            }
        }
    }
}

impl PriceWsHandler for BitfinexWsHandler {
    fn create_messages(
        &mut self,
        tickers: &[ProviderTicker],
    ) -> Result<Vec<WsMessage>, ProviderError> {
        // The venue accepts a single pair per subscribe frame; batching happens at the
        // write schedule, not in the payload.
        tickers
            .iter()
            .map(|ticker| {
                self.cache.add(ticker.clone());
                messages::subscribe_message(ticker.off_chain_ticker())
            })
            .collect()
    }

    fn handle_message(&mut self, payload: &str) -> Result<HandledFrame, ProviderError> {
        if let Ok(frame) = serde_json::from_str::<StreamFrame>(payload) {
            return self.handle_stream_frame(frame);
        }

        if let Ok(event) = serde_json::from_str::<EventMessage>(payload) {
            return self.handle_event(event);
        }

        Err(ProviderError::new(
            ErrorCode::FailedToDecode,
            "unclassifiable message",
        ))
    }

    fn fresh(&self) -> Box<dyn PriceWsHandler> {
        Box::new(Self {
            cache: ProviderTickerCache::new(),
            channel_map: FnvHashMap::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn subscribed_handler() -> BitfinexWsHandler {
        let mut handler = BitfinexWsHandler::new(default_websocket_config()).unwrap();
        handler
            .create_messages(&[ProviderTicker::new("BTC/USD", "BTCUSD", "")])
            .unwrap();
        handler
            .handle_message(
                r#"{"event": "subscribed", "channel": "ticker", "chanId": 224, "pair": "BTCUSD"}"#,
            )
            .unwrap();
        handler
    }

    #[test]
    fn test_confirmation_builds_channel_map() {
        let handler = subscribed_handler();
        assert_eq!(
            handler.channel_map.get(&224).unwrap().ticker(),
            "BTC/USD"
        );
    }

    #[test]
    fn test_ticker_frame_resolves_via_channel_map() {
        let mut handler = subscribed_handler();
        let payload =
            "[224, [41900.1, 12.5, 41900.2, 10.1, -120.5, -0.0029, 42000.5, 3300.2, 42400.0, 41000.0]]";

        let handled = handler.handle_message(payload).unwrap();
        let response = handled.response.unwrap();
        assert_eq!(
            response.resolved.values().next().unwrap().price,
            dec!(42000.5)
        );
    }

    #[test]
    fn test_heartbeat_frame_is_ignored() {
        let mut handler = subscribed_handler();
        let handled = handler.handle_message(r#"[224, "hb"]"#).unwrap();
        assert!(handled.response.is_none());
    }

    #[test]
    fn test_error_event_resubscribes_cached_pairs() {
        let mut handler = subscribed_handler();
        let handled = handler
            .handle_message(r#"{"event": "error", "msg": "subscribe: dup", "code": 10301}"#)
            .unwrap();

        assert!(handled.response.is_none());
        assert_eq!(handled.replies.len(), 1);
    }

    #[test]
    fn test_confirmation_for_unknown_pair_errors() {
        let mut handler = BitfinexWsHandler::new(default_websocket_config()).unwrap();
        let result = handler.handle_message(
            r#"{"event": "subscribed", "channel": "ticker", "chanId": 7, "pair": "ETHUSD"}"#,
        );

        match result {
            Err(error) => assert_eq!(error.code(), ErrorCode::UnknownPair),
            Ok(handled) => panic!("expected error, got {handled:?}"),
        }
    }
}
