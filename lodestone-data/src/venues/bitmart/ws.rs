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
use messages::{EventMessage, TickersMessage};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

/// [`PriceWsHandler`] for the Bitmart spot ticker channel.
///
/// Bitmart sends no application-level heartbeats; the connection is dropped by the read
/// timeout when the venue goes silent.
#[derive(Debug)]
pub struct BitmartWsHandler {
    ws: WebSocketConfig,
    cache: ProviderTickerCache,
}

impl BitmartWsHandler {
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

    fn parse_tickers_message(&self, message: TickersMessage) -> Result<PriceResponse, ProviderError> {
        if message.table != messages::TICKERS_CHANNEL {
            return Err(ProviderError::new(
                ErrorCode::InvalidResponse,
                format!("invalid channel {}", message.table),
            ));
        }

        let mut resolved = ResolvedPrices::default();
        let mut unresolved = UnresolvedPrices::default();
        let time = Utc::now();

        for instrument in message.data {
            let Some(ticker) = self.cache.from_off_chain_ticker(&instrument.symbol) else {
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

impl PriceWsHandler for BitmartWsHandler {
    fn create_messages(
        &mut self,
        tickers: &[ProviderTicker],
    ) -> Result<Vec<WsMessage>, ProviderError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let symbols: Vec<&str> = tickers
            .iter()
            .map(|ticker| {
                self.cache.add(ticker.clone());
                ticker.off_chain_ticker().as_str()
            })
            .collect();

        messages::subscribe_messages(&symbols, self.ws.max_subscriptions_per_batch)
    }

    fn handle_message(&mut self, payload: &str) -> Result<HandledFrame, ProviderError> {
        if let Ok(message) = serde_json::from_str::<TickersMessage>(payload) {
            return self
                .parse_tickers_message(message)
                .map(HandledFrame::response);
        }

        if let Ok(event) = serde_json::from_str::<EventMessage>(payload) {
            if event.event == messages::EVENT_SUBSCRIBE {
                match &event.error_code {
                    None => debug!(topic = event.topic.as_deref().unwrap_or(""), "subscribed"),
                    Some(code) => warn!(
                        code,
                        message = event.error_message.as_deref().unwrap_or(""),
                        "subscription rejected"
                    ),
                }
                return Ok(HandledFrame::empty());
            }
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
        })
    }
}
