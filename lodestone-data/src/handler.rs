use crate::{error::ProviderError, response::PriceResponse, ticker::ProviderTicker};
use lodestone_integration::protocol::websocket::WsMessage;
use reqwest::StatusCode;
use std::fmt::Debug;

/// Per-venue pure transformation for a request/response price API.
///
/// Implementations are stateless with respect to the network: the
/// [`fetcher`](crate::fetcher) owns scheduling, transport and error capture, the handler
/// owns URL construction and payload interpretation.
pub trait PriceApiHandler
where
    Self: Debug + Send + Sync,
{
    /// Produce the URL fetching a batch of tickers.
    ///
    /// An *atomic* handler must receive exactly one ticker and errors otherwise;
    /// non-atomic handlers accept up to the configured `max_queries`.
    fn create_url(&self, tickers: &[ProviderTicker]) -> Result<String, ProviderError>;

    /// Interpret a response payload. Every input ticker must appear in exactly one of the
    /// returned maps.
    fn parse_response(
        &self,
        tickers: &[ProviderTicker],
        status: StatusCode,
        payload: &[u8],
    ) -> PriceResponse;
}

/// Everything a WebSocket data handler extracted from one classified frame.
#[derive(Debug, Default)]
pub struct HandledFrame {
    /// Price updates carried by the frame, if it was a ticker update.
    pub response: Option<PriceResponse>,
    /// Frames to send back to the venue (handshake replies, re-subscribes).
    pub replies: Vec<WsMessage>,
}

impl HandledFrame {
    /// A classified frame requiring no action (subscribe ack, heartbeat, info).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame carrying price updates.
    pub fn response(response: PriceResponse) -> Self {
        Self {
            response: Some(response),
            replies: Vec::new(),
        }
    }

    /// A frame answered with reply frames.
    pub fn replies(replies: Vec<WsMessage>) -> Self {
        Self {
            response: None,
            replies,
        }
    }
}

/// Per-venue transformation for a streaming WebSocket feed.
///
/// The [`connector`](crate::connector) owns the socket, reconnection and scheduling; the
/// handler owns subscription encoding and frame classification. Handlers hold per
/// connection runtime state (ticker cache, confirmation channel ids) and are therefore
/// re-created via [`Self::fresh`] for every connection.
pub trait PriceWsHandler
where
    Self: Debug + Send + Sync,
{
    /// Encode subscription frames for the provided tickers, batched by the configured
    /// `max_subscriptions_per_batch`. Produces `ceil(n / max_per_batch)` frames for
    /// batching venues.
    fn create_messages(
        &mut self,
        tickers: &[ProviderTicker],
    ) -> Result<Vec<WsMessage>, ProviderError>;

    /// Classify one frame by attempting structural decodes in order.
    ///
    /// Returns an error only when the frame cannot be classified at all; the connector
    /// logs and drops such frames without breaking the read loop.
    fn handle_message(&mut self, payload: &str) -> Result<HandledFrame, ProviderError>;

    /// Heartbeat frames to send every ping interval. May be empty for venues with
    /// protocol-level keepalive only.
    fn heartbeat_messages(&self) -> Vec<WsMessage> {
        Vec::new()
    }

    /// A handler with the same configuration but empty runtime state, for the next
    /// connection.
    fn fresh(&self) -> Box<dyn PriceWsHandler>;
}
