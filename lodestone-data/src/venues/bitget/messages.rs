use crate::error::{ErrorCode, ProviderError};
use lodestone_integration::protocol::websocket::WsMessage;
use serde::{Deserialize, Serialize};

/// Operation used to subscribe to a channel.
pub const OPERATION_SUBSCRIBE: &str = "subscribe";

/// Application-level heartbeat payloads. Bitget expects a literal `ping` text frame and
/// answers with a literal `pong`.
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

/// Channel carrying spot last-price updates.
pub const TICKERS_CHANNEL: &str = "ticker";

/// Instrument class subscribed to.
pub const SPOT_INSTRUMENT_TYPE: &str = "SPOT";

/// Event denoting a successful channel subscription.
pub const EVENT_SUBSCRIBE: &str = "subscribe";

/// Event denoting a rejected request.
pub const EVENT_ERROR: &str = "error";

/// Topic argument of a subscribe request.
///
/// ```json
/// {"channel": "ticker", "instId": "BTCUSDT", "instType": "SPOT"}
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionTopic {
    pub channel: String,
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "instType")]
    pub inst_type: String,
}

impl SubscriptionTopic {
    pub fn spot_ticker(inst_id: &str) -> Self {
        Self {
            channel: TICKERS_CHANNEL.to_string(),
            inst_id: inst_id.to_string(),
            inst_type: SPOT_INSTRUMENT_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscribeRequest {
    op: &'static str,
    args: Vec<SubscriptionTopic>,
}

/// Encode subscribe frames for the provided topics, `max_per_batch` topics per frame.
///
/// Produces `ceil(topics.len() / max_per_batch)` frames.
pub fn subscribe_messages(
    topics: &[SubscriptionTopic],
    max_per_batch: usize,
) -> Result<Vec<WsMessage>, ProviderError> {
    if topics.is_empty() {
        return Err(ProviderError::new(
            ErrorCode::InvalidResponse,
            "instruments cannot be empty",
        ));
    }

    topics
        .chunks(max_per_batch)
        .map(|batch| {
            serde_json::to_string(&SubscribeRequest {
                op: OPERATION_SUBSCRIBE,
                args: batch.to_vec(),
            })
            .map(WsMessage::text)
            .map_err(|error| ProviderError::new(ErrorCode::Unknown, error.to_string()))
        })
        .collect()
}

/// Subscription lifecycle event sent by the venue.
///
/// ```json
/// {"event": "subscribe", "arg": {"channel": "ticker", "instId": "BTCUSDT", "instType": "SPOT"}}
/// {"event": "error", "code": "30001", "msg": "channel does not exist"}
/// ```
#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub event: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Last-price push for a set of subscribed instruments.
///
/// ```json
/// {
///   "action": "snapshot",
///   "arg": {"channel": "ticker", "instId": "BTCUSDT", "instType": "SPOT"},
///   "data": [{"instId": "BTCUSDT", "lastPr": "42000.5"}],
///   "ts": 1700000000000
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TickersMessage {
    pub action: String,
    pub arg: SubscriptionTopic,
    pub data: Vec<TickerData>,
    pub ts: u64,
}

#[derive(Debug, Deserialize)]
pub struct TickerData {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "lastPr")]
    pub last_pr: String,
}
