use crate::error::{ErrorCode, ProviderError};
use lodestone_integration::protocol::websocket::WsMessage;
use serde::{Deserialize, Serialize};

/// Channel carrying ticker updates.
pub const TICKER_CHANNEL: &str = "ticker";

/// Payload of a heartbeat stream frame.
pub const HEARTBEAT: &str = "hb";

/// Index of the last traded price within a ticker stream frame.
pub const LAST_PRICE_INDEX: usize = 6;

/// Minimum number of fields in a ticker stream frame.
pub const TICKER_FRAME_FIELDS: usize = 10;

/// Subscription request. One frame subscribes one pair.
///
/// ```json
/// {"event": "subscribe", "channel": "ticker", "pair": "BTCUSD"}
/// ```
#[derive(Debug, Serialize)]
pub struct SubscribeMessage {
    pub event: &'static str,
    pub channel: &'static str,
    pub pair: String,
}

/// Encode the subscribe frame for one venue pair.
pub fn subscribe_message(pair: &str) -> Result<WsMessage, ProviderError> {
    serde_json::to_string(&SubscribeMessage {
        event: "subscribe",
        channel: TICKER_CHANNEL,
        pair: pair.to_string(),
    })
    .map(WsMessage::text)
    .map_err(|error| ProviderError::new(ErrorCode::Unknown, error.to_string()))
}

/// Event messages are JSON objects tagged by `event`; stream frames are JSON arrays.
///
/// ### Raw Payload Examples
/// #### Subscribed
/// ```json
/// {"event": "subscribed", "channel": "ticker", "chanId": 224, "pair": "BTCUSD"}
/// ```
///
/// #### Error
/// ```json
/// {"event": "error", "msg": "symbol: invalid", "code": 10300}
/// ```
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EventMessage {
    /// Connection banner sent after the handshake.
    Info {
        #[serde(default)]
        version: Option<u64>,
    },
    Subscribed {
        channel: String,
        #[serde(rename = "chanId")]
        chan_id: i64,
        pair: String,
    },
    Error {
        msg: String,
        code: i64,
    },
}

/// Stream frame: `[CHAN_ID, payload]` where the payload is either the string `"hb"` or a
/// ticker field array whose seventh entry is the last traded price.
///
/// ```json
/// [224, [41900.1, 12.5, 41900.2, 10.1, -120.5, -0.0029, 42000.5, 3300.2, 42400.0, 41000.0]]
/// [224, "hb"]
/// ```
#[derive(Debug, Deserialize)]
pub struct StreamFrame(pub i64, pub StreamPayload);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StreamPayload {
    Heartbeat(String),
    Ticker(Vec<f64>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_event_messages() {
        let subscribed: EventMessage = serde_json::from_str(
            r#"{"event": "subscribed", "channel": "ticker", "chanId": 224, "pair": "BTCUSD"}"#,
        )
        .unwrap();
        assert!(matches!(
            subscribed,
            EventMessage::Subscribed { chan_id: 224, .. }
        ));

        let info: EventMessage = serde_json::from_str(
            r#"{"event": "info", "version": 2, "platform": {"status": 1}}"#,
        )
        .unwrap();
        assert!(matches!(info, EventMessage::Info { version: Some(2) }));

        let error: EventMessage =
            serde_json::from_str(r#"{"event": "error", "msg": "symbol: invalid", "code": 10300}"#)
                .unwrap();
        assert!(matches!(error, EventMessage::Error { code: 10300, .. }));
    }

    #[test]
    fn test_deserialize_stream_frames() {
        let ticker: StreamFrame = serde_json::from_str(
            "[224, [41900.1, 12.5, 41900.2, 10.1, -120.5, -0.0029, 42000.5, 3300.2, 42400.0, 41000.0]]",
        )
        .unwrap();
        assert_eq!(ticker.0, 224);
        match ticker.1 {
            StreamPayload::Ticker(fields) => {
                assert_eq!(fields.len(), TICKER_FRAME_FIELDS);
                assert_eq!(fields[LAST_PRICE_INDEX], 42000.5);
            }
            other => panic!("expected ticker payload, got {other:?}"),
        }

        let heartbeat: StreamFrame = serde_json::from_str(r#"[224, "hb"]"#).unwrap();
        assert!(matches!(
            heartbeat.1,
            StreamPayload::Heartbeat(ref payload) if payload == HEARTBEAT
        ));
    }
}
