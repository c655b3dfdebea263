use crate::error::{ErrorCode, ProviderError};
use lodestone_integration::protocol::websocket::WsMessage;
use serde::{Deserialize, Serialize};

/// Operation used to subscribe to a channel.
pub const OPERATION_SUBSCRIBE: &str = "subscribe";

/// Channel carrying spot last-price updates. Subscription arguments are formatted as
/// `spot/ticker:SYMBOL`.
pub const TICKERS_CHANNEL: &str = "spot/ticker";

/// Event denoting a successful channel subscription.
pub const EVENT_SUBSCRIBE: &str = "subscribe";

#[derive(Debug, Serialize)]
struct SubscribeRequest {
    op: &'static str,
    args: Vec<String>,
}

/// Encode subscribe frames for the provided venue symbols, `max_per_batch` symbols per
/// frame. Produces `ceil(symbols.len() / max_per_batch)` frames.
pub fn subscribe_messages(
    symbols: &[&str],
    max_per_batch: usize,
) -> Result<Vec<WsMessage>, ProviderError> {
    if symbols.is_empty() {
        return Err(ProviderError::new(
            ErrorCode::InvalidResponse,
            "instruments cannot be empty",
        ));
    }

    symbols
        .chunks(max_per_batch)
        .map(|batch| {
            let args = batch
                .iter()
                .map(|symbol| format!("{TICKERS_CHANNEL}:{symbol}"))
                .collect();

            serde_json::to_string(&SubscribeRequest {
                op: OPERATION_SUBSCRIBE,
                args,
            })
            .map(WsMessage::text)
            .map_err(|error| ProviderError::new(ErrorCode::Unknown, error.to_string()))
        })
        .collect()
}

/// Subscription lifecycle event sent by the venue.
///
/// ```json
/// {"event": "subscribe", "topic": "spot/ticker:BTC_USDT"}
/// ```
#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub event: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

/// Last-price push for a set of subscribed instruments.
///
/// ```json
/// {"table": "spot/ticker", "data": [{"symbol": "BTC_USDT", "last_price": "42000.5"}]}
/// ```
#[derive(Debug, Deserialize)]
pub struct TickersMessage {
    pub table: String,
    pub data: Vec<TickerData>,
}

#[derive(Debug, Deserialize)]
pub struct TickerData {
    pub symbol: String,
    pub last_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_messages_formats_topics() {
        let messages = subscribe_messages(&["BTC_USDT", "ETH_USDT"], 10).unwrap();
        assert_eq!(messages.len(), 1);

        let WsMessage::Text(payload) = &messages[0] else {
            panic!("expected text frame");
        };
        assert_eq!(
            payload.as_str(),
            r#"{"op":"subscribe","args":["spot/ticker:BTC_USDT","spot/ticker:ETH_USDT"]}"#
        );
    }

    #[test]
    fn test_subscribe_messages_batching() {
        let symbols: Vec<String> = (0..25).map(|i| format!("SYM{i}_USDT")).collect();
        let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();

        assert_eq!(subscribe_messages(&refs, 10).unwrap().len(), 3);
    }
}
