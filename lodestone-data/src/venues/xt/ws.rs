use super::{WS_NAME, messages};
use crate::{
    config::WebSocketConfig,
    error::{DataError, ErrorCode, ProviderError},
    handler::{HandledFrame, PriceWsHandler},
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::{ProviderTicker, ProviderTickerCache},
};
use chrono::Utc;
use lodestone_integration::protocol::websocket::WsMessage;
use messages::{SubscribeResponse, TickersMessage};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

/// [`PriceWsHandler`] for the XT public ticker stream.
#[derive(Debug)]
pub struct XtWsHandler {
    ws: WebSocketConfig,
    cache: ProviderTickerCache,
    /// Request id of the next subscribe frame sent on this connection.
    next_request_id: u64,
}

impl XtWsHandler {
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
            next_request_id: 1,
        })
    }

    fn parse_tickers_message(&self, message: TickersMessage) -> Result<PriceResponse, ProviderError> {
        if message.topic != messages::TICKERS_TOPIC {
            return Err(ProviderError::new(
                ErrorCode::InvalidResponse,
                format!("invalid topic {}", message.topic),
            ));
        }

        let mut resolved = ResolvedPrices::default();
        let mut unresolved = UnresolvedPrices::default();
        let time = Utc::now();

        for instrument in message.data {
            // Symbols stream back lowercase regardless of how they were subscribed.
            let Some(ticker) = self
                .cache
                .from_off_chain_ticker(&instrument.symbol.to_uppercase())
            else {
                debug!(symbol = %instrument.symbol, "ticker not found for instrument");
                continue;
            };

            match Decimal::from_str(&instrument.last_price) {
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

        Ok(PriceResponse::new(resolved, unresolved))
    }
}

impl PriceWsHandler for XtWsHandler {
    fn create_messages(
        &mut self,
        tickers: &[ProviderTicker],
    ) -> Result<Vec<WsMessage>, ProviderError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let params: Vec<String> = tickers
            .iter()
            .map(|ticker| {
                self.cache.add(ticker.clone());
                messages::ticker_param(ticker.off_chain_ticker())
            })
            .collect();

        let encoded = messages::subscribe_messages(
            &params,
            self.ws.max_subscriptions_per_batch,
            self.next_request_id,
        )?;
        self.next_request_id += encoded.len() as u64;

        Ok(encoded)
    }

    fn handle_message(&mut self, payload: &str) -> Result<HandledFrame, ProviderError> {
        if let Ok(message) = serde_json::from_str::<TickersMessage>(payload) {
            return self
                .parse_tickers_message(message)
                .map(HandledFrame::response);
        }

        if let Ok(ack) = serde_json::from_str::<SubscribeResponse>(payload) {
            if ack.code == 0 {
                debug!(id = ack.id.as_deref().unwrap_or(""), "subscribed");
            } else {
                warn!(
                    id = ack.id.as_deref().unwrap_or(""),
                    code = ack.code,
                    msg = ack.msg.as_deref().unwrap_or(""),
                    "subscription rejected"
                );
            }
            return Ok(HandledFrame::empty());
        }

        Err(ProviderError::new(
            ErrorCode::FailedToDecode,
            "unclassifiable message",
        ))
    }

    fn fresh(&self) -> Box<dyn PriceWsHandler> {
        Box::new(Self {
            ws: self.ws.clone(),
            cache: ProviderTickerCache::new(),
            next_request_id: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::xt::default_websocket_config;
    use rust_decimal_macros::dec;

    fn handler_with_cache() -> XtWsHandler {
        let mut handler = XtWsHandler::new(default_websocket_config()).unwrap();
        handler
            .create_messages(&[ProviderTicker::new("BTC/USD", "BTC_USDT", "")])
            .unwrap();
        handler
    }

    #[test]
    fn test_handle_ticker_update_lowercase_symbol() {
        let mut handler = handler_with_cache();
        let payload = r#"{"topic":"ticker","data":[{"s":"btc_usdt","c":"42000.5"}]}"#;

        let handled = handler.handle_message(payload).unwrap();
        let response = handled.response.unwrap();
        assert_eq!(
            response.resolved.values().next().unwrap().price,
            dec!(42000.5)
        );
    }

    #[test]
    fn test_handle_subscribe_ack() {
        let mut handler = handler_with_cache();
        let handled = handler
            .handle_message(r#"{"id":"1","code":0,"msg":"success"}"#)
            .unwrap();
        assert!(handled.response.is_none());
    }

    #[test]
    fn test_request_ids_advance_per_batch() {
        let mut handler = XtWsHandler::new(default_websocket_config()).unwrap();
        let tickers: Vec<ProviderTicker> = (0..3)
            .map(|i| ProviderTicker::new(format!("SYM{i}/USD"), format!("SYM{i}_USDT"), ""))
            .collect();

        let mut config_batches = handler.create_messages(&tickers).unwrap();
        assert_eq!(config_batches.len(), 1);
        config_batches = handler.create_messages(&tickers).unwrap();
        assert_eq!(config_batches.len(), 1);

        let WsMessage::Text(payload) = &config_batches[0] else {
            panic!("expected text frame");
        };
        let request: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
        assert_eq!(request["id"], "2");
    }
}
