use crate::error::{ErrorCode, ProviderError};
use lodestone_integration::protocol::websocket::WsMessage;
use serde::{Deserialize, Serialize};

/// Method used to subscribe to topics.
pub const METHOD_SUBSCRIBE: &str = "subscribe";

/// Topic carrying spot last-price updates. Subscription parameters are formatted as
/// `ticker@btc_usdt`, lowercase.
pub const TICKERS_TOPIC: &str = "ticker";

/// Build the subscription parameter for a venue symbol.
pub fn ticker_param(symbol: &str) -> String {
    format!("{TICKERS_TOPIC}@{}", symbol.to_lowercase())
}

/// Subscription request.
///
/// ```json
/// {"id": "1", "method": "subscribe", "params": ["ticker@btc_usdt"]}
/// ```
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    pub id: String,
    pub method: &'static str,
    pub params: Vec<String>,
}

/// Encode subscribe frames for the provided params, `max_per_batch` params per frame,
/// with request ids continuing from `first_id`. Produces
/// `ceil(params.len() / max_per_batch)` frames.
pub fn subscribe_messages(
    params: &[String],
    max_per_batch: usize,
    first_id: u64,
) -> Result<Vec<WsMessage>, ProviderError> {
    if params.is_empty() {
        return Err(ProviderError::new(
            ErrorCode::InvalidResponse,
            "cannot attach payload of 0 length",
        ));
    }

    params
        .chunks(max_per_batch)
        .enumerate()
        .map(|(index, batch)| {
            serde_json::to_string(&SubscribeRequest {
                id: (first_id + index as u64).to_string(),
                method: METHOD_SUBSCRIBE,
                params: batch.to_vec(),
            })
            .map(WsMessage::text)
            .map_err(|error| ProviderError::new(ErrorCode::Unknown, error.to_string()))
        })
        .collect()
}

/// Acknowledgement of a subscribe request. A non-zero code is a rejection.
///
/// ```json
/// {"id": "1", "code": 0, "msg": "success"}
/// ```
#[derive(Debug, Deserialize)]
pub struct SubscribeResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Last-price push for a set of subscribed instruments. Symbols stream back lowercase.
///
/// ```json
/// {"topic": "ticker", "data": [{"s": "btc_usdt", "c": "42000.5"}]}
/// ```
#[derive(Debug, Deserialize)]
pub struct TickersMessage {
    pub topic: String,
    pub data: Vec<TickerData>,
}

#[derive(Debug, Deserialize)]
pub struct TickerData {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub last_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_param_lowercases() {
        assert_eq!(ticker_param("BTC_USDT"), "ticker@btc_usdt");
    }

    #[test]
    fn test_subscribe_messages_batching_and_ids() {
        let params: Vec<String> = (0..25).map(|i| ticker_param(&format!("SYM{i}_USDT"))).collect();
        let messages = subscribe_messages(&params, 10, 5).unwrap();
        assert_eq!(messages.len(), 3);

        let WsMessage::Text(payload) = &messages[2] else {
            panic!("expected text frame");
        };
        let request: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
        assert_eq!(request["id"], "7");
    }
}
