use crate::error::{ErrorCode, ProviderError};
use lodestone_integration::protocol::websocket::WsMessage;
use serde::{Deserialize, Serialize};

/// Operation used to subscribe to topics.
pub const OPERATION_SUBSCRIBE: &str = "subscribe";

/// Operation used for the application-level heartbeat. The venue pongs with the same op.
pub const OPERATION_PING: &str = "ping";

/// Message type of a command acknowledgement.
pub const TYPE_COMMAND_RESP: &str = "COMMAND_RESP";

/// Message type of a ticker snapshot push.
pub const TYPE_SNAPSHOT: &str = "snapshot";

/// Topic prefix for ticker subscriptions: `tickers.BTC-USD`.
pub const TICKERS_TOPIC_PREFIX: &str = "tickers";

/// Build the subscription topic for a venue symbol.
pub fn ticker_topic(symbol: &str) -> String {
    format!("{TICKERS_TOPIC_PREFIX}.{symbol}")
}

/// Subscription request.
///
/// ```json
/// {"op": "subscribe", "id": "1", "args": ["tickers.BTC-USD", "tickers.SATS-USD"]}
/// ```
#[derive(Debug, Serialize)]
pub struct SubscriptionRequest {
    pub op: &'static str,
    pub id: String,
    pub args: Vec<String>,
}

/// Encode subscribe frames for the provided topics, `max_per_batch` topics per frame.
/// Produces `ceil(topics.len() / max_per_batch)` frames.
pub fn subscribe_messages(
    topics: &[String],
    max_per_batch: usize,
) -> Result<Vec<WsMessage>, ProviderError> {
    if topics.is_empty() {
        return Err(ProviderError::new(
            ErrorCode::InvalidResponse,
            "topics cannot be empty",
        ));
    }

    topics
        .chunks(max_per_batch)
        .enumerate()
        .map(|(index, batch)| {
            serde_json::to_string(&SubscriptionRequest {
                op: OPERATION_SUBSCRIBE,
                id: (index + 1).to_string(),
                args: batch.to_vec(),
            })
            .map(WsMessage::text)
            .map_err(|error| ProviderError::new(ErrorCode::Unknown, error.to_string()))
        })
        .collect()
}

/// Application-level heartbeat ping.
///
/// ```json
/// {"op": "ping"}
/// ```
pub fn ping_message() -> Result<WsMessage, ProviderError> {
    #[derive(Serialize)]
    struct Ping {
        op: &'static str,
    }

    serde_json::to_string(&Ping { op: OPERATION_PING })
        .map(WsMessage::text)
        .map_err(|error| ProviderError::new(ErrorCode::Unknown, error.to_string()))
}

/// Command acknowledgement, including which topics the venue accepted.
///
/// ```json
/// {
///   "type": "COMMAND_RESP",
///   "id": "1",
///   "success": true,
///   "data": {"success_topics": ["tickers.BTC-USD"], "fail_topics": []}
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CommandResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: CommandResponseData,
    #[serde(rename = "ret_msg", default)]
    pub ret_msg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandResponseData {
    #[serde(default)]
    pub success_topics: Vec<String>,
    #[serde(default)]
    pub fail_topics: Vec<String>,
}

/// Ticker snapshot push for one subscribed topic.
///
/// ```json
/// {
///   "type": "snapshot",
///   "topic": "tickers.BTC-USD",
///   "ts": 1704449555000,
///   "data": {"symbol": "BTC-USD", "lastPrice": "42000.5"}
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TickerUpdateMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub topic: String,
    #[serde(default)]
    pub ts: i64,
    pub data: TickerUpdateData,
}

#[derive(Debug, Deserialize)]
pub struct TickerUpdateData {
    pub symbol: String,
    #[serde(rename = "lastPrice")]
    pub last_price: String,
}

/// Pong answered to an application-level ping.
///
/// ```json
/// {"op": "ping", "args": ["1704449555000"]}
/// ```
#[derive(Debug, Deserialize)]
pub struct HeartbeatPong {
    pub op: String,
    #[serde(default)]
    pub args: Vec<String>,
}
