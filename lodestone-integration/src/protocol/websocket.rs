use crate::error::SocketError;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, connect_async};
use tracing::debug;

pub use tokio_tungstenite::tungstenite::error::ProtocolError;

/// A tungstenite WebSocket stream over a plain or TLS TCP connection.
pub type WebSocket = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a split [`WebSocket`].
pub type WsSink = futures::stream::SplitSink<WebSocket, WsMessage>;

/// Read half of a split [`WebSocket`].
pub type WsStream = futures::stream::SplitStream<WebSocket>;

/// Frame type exchanged over a [`WebSocket`].
pub type WsMessage = tokio_tungstenite::tungstenite::Message;

/// Transport error produced by a [`WebSocket`].
pub type WsError = tokio_tungstenite::tungstenite::Error;

/// Dial a WebSocket endpoint and complete the opening handshake.
///
/// Waits as long as the server does; callers that need a handshake deadline wrap this in
/// their own timeout.
pub async fn connect(url: &str) -> Result<WebSocket, SocketError> {
    debug!(url, "dialing WebSocket endpoint");

    let (websocket, _response) = connect_async(url)
        .await
        .map_err(|error| SocketError::WebSocket(Box::new(error)))?;

    Ok(websocket)
}

/// Extract the UTF-8 payload of a Text or Binary [`WsMessage`], if it has one.
///
/// Control frames (Ping, Pong, Close, raw Frame) carry no payload for a data handler and
/// yield `None`.
pub fn text_payload(message: &WsMessage) -> Option<&str> {
    match message {
        WsMessage::Text(text) => Some(text.as_str()),
        WsMessage::Binary(binary) => std::str::from_utf8(binary).ok(),
        _ => None,
    }
}
