use super::{WS_NAME, messages};
use crate::{
    config::WebSocketConfig,
    error::{DataError, ErrorCode, ProviderError},
    handler::{HandledFrame, PriceWsHandler},
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::{ProviderTicker, ProviderTickerCache},
};
use chrono::{DateTime, Utc};
use lodestone_integration::protocol::websocket::WsMessage;
use messages::{CommandResponse, HeartbeatPong, TickerUpdateMessage};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

/// [`PriceWsHandler`] for the Bitverse public ticker stream.
///
/// The venue acknowledges subscriptions per topic; rejected topics are re-subscribed via
/// reply frames rather than torn down with the whole connection.
#[derive(Debug)]
pub struct BitverseWsHandler {
    ws: WebSocketConfig,
    cache: ProviderTickerCache,
}

impl BitverseWsHandler {
    pub fn new(ws: WebSocketConfig) -> Result<Self, DataError> {
        if ws.name != WS_NAME {
            return Err(DataError::config(
                WS_NAME,
                format!("expected websocket config name {WS_NAME}, got {}", ws.name),
            ));
        }
        if !ws.enabled {
            return Err(DataError::config(WS_NAME, "websocket config is not enabled"));
        }
        ws.validate()?;

        Ok(Self {
            ws,
            cache: ProviderTickerCache::new(),
        })
    }

    fn parse_ticker_update(&self, update: TickerUpdateMessage) -> PriceResponse {
        let mut resolved = ResolvedPrices::default();
        let mut unresolved = UnresolvedPrices::default();

        let Some(ticker) = self.cache.from_off_chain_ticker(&update.data.symbol) else {
            debug!(symbol = %update.data.symbol, "ticker not found for symbol");
            return PriceResponse::default();
        };

        let time = DateTime::<Utc>::from_timestamp_millis(update.ts).unwrap_or_else(Utc::now);

        match Decimal::from_str(&update.data.last_price) {
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

        PriceResponse::new(resolved, unresolved)
    }

    fn handle_command_response(
        &self,
        response: CommandResponse,
    ) -> Result<HandledFrame, ProviderError> {
        if !response.data.fail_topics.is_empty() {
            warn!(
                fail_topics = ?response.data.fail_topics,
                ret_msg = response.ret_msg.as_deref().unwrap_or(""),
                "venue rejected topics, re-subscribing"
            );

            let replies = messages::subscribe_messages(
                &response.data.fail_topics,
                self.ws.max_subscriptions_per_batch,
            )?;
            return Ok(HandledFrame::replies(replies));
        }

        debug!(
            success = response.success,
            topics = response.data.success_topics.len(),
            "subscription acknowledged"
        );
        Ok(HandledFrame::empty())
    }
}

impl PriceWsHandler for BitverseWsHandler {
    fn create_messages(
        &mut self,
        tickers: &[ProviderTicker],
    ) -> Result<Vec<WsMessage>, ProviderError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let topics: Vec<String> = tickers
            .iter()
            .map(|ticker| {
                self.cache.add(ticker.clone());
                messages::ticker_topic(ticker.off_chain_ticker())
            })
            .collect();

        messages::subscribe_messages(&topics, self.ws.max_subscriptions_per_batch)
    }

    fn handle_message(&mut self, payload: &str) -> Result<HandledFrame, ProviderError> {
        if let Ok(update) = serde_json::from_str::<TickerUpdateMessage>(payload) {
            if update.kind == messages::TYPE_SNAPSHOT {
                return Ok(HandledFrame::response(self.parse_ticker_update(update)));
            }
        }

        if let Ok(response) = serde_json::from_str::<CommandResponse>(payload) {
            if response.kind == messages::TYPE_COMMAND_RESP {
                return self.handle_command_response(response);
            }
        }

        if let Ok(pong) = serde_json::from_str::<HeartbeatPong>(payload) {
            if pong.op == messages::OPERATION_PING {
                debug!(args = ?pong.args, "received heartbeat pong");
                return Ok(HandledFrame::empty());
            }
        }

        Err(ProviderError::new(
            ErrorCode::FailedToDecode,
            "unclassifiable message",
        ))
    }

    fn heartbeat_messages(&self) -> Vec<WsMessage> {
        match messages::ping_message() {
            Ok(message) => vec![message],
            Err(error) => {
                warn!(%error, "failed to encode heartbeat");
                Vec::new()
            }
        }
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
    use crate::venues::bitverse::default_websocket_config;
    use rust_decimal_macros::dec;

    fn handler_with_cache() -> BitverseWsHandler {
        let mut handler = BitverseWsHandler::new(default_websocket_config()).unwrap();
        handler
            .create_messages(&[ProviderTicker::new("BTC/USD", "BTC-USD", "")])
            .unwrap();
        handler
    }

    #[test]
    fn test_handle_snapshot_update() {
        let mut handler = handler_with_cache();
        let payload = r#"{
            "type": "snapshot",
            "topic": "tickers.BTC-USD",
            "ts": 1704449555000,
            "data": {"symbol": "BTC-USD", "lastPrice": "42000.5"}
        }"#;

        let handled = handler.handle_message(payload).unwrap();
        let response = handled.response.unwrap();
        assert_eq!(
            response.resolved.values().next().unwrap().price,
            dec!(42000.5)
        );
    }

    #[test]
    fn test_handle_command_response_resubscribes_failed_topics() {
        let mut handler = handler_with_cache();
        let payload = r#"{
            "type": "COMMAND_RESP",
            "success": false,
            "data": {"success_topics": [], "fail_topics": ["tickers.BTC-USD"]}
        }"#;

        let handled = handler.handle_message(payload).unwrap();
        assert!(handled.response.is_none());
        assert_eq!(handled.replies.len(), 1);
    }

    #[test]
    fn test_handle_pong() {
        let mut handler = handler_with_cache();
        let handled = handler
            .handle_message(r#"{"op": "ping", "args": ["1704449555000"]}"#)
            .unwrap();
        assert!(handled.response.is_none());
        assert!(handled.replies.is_empty());
    }

    #[test]
    fn test_heartbeat_messages() {
        let handler = handler_with_cache();
        assert_eq!(handler.heartbeat_messages().len(), 1);
    }
}
