use crate::{
    config::WebSocketConfig,
    error::DataError,
    handler::PriceWsHandler,
    response::PriceResponse,
    ticker::ProviderTicker,
};
use futures::{SinkExt, StreamExt};
use lodestone_integration::protocol::websocket::{
    ProtocolError, WebSocket, WsError, WsMessage, WsSink, connect, text_payload,
};
use smol_str::SmolStr;
use std::time::Duration;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Drives a [`PriceWsHandler`] over one or more persistent WebSocket connections.
///
/// The driver is a supervisor: it splits the current ticker set into
/// `max_subscriptions_per_connection`-sized slices, runs one [`Connection`] state machine
/// per slice (each with a fresh handler), and rebuilds the connection set whenever the
/// provider swaps its working ticker set.
#[derive(Debug)]
pub(crate) struct WsDriver {
    name: SmolStr,
    config: WebSocketConfig,
    handler: Box<dyn PriceWsHandler>,
}

impl WsDriver {
    pub fn new(
        name: SmolStr,
        config: WebSocketConfig,
        handler: Box<dyn PriceWsHandler>,
    ) -> Result<Self, DataError> {
        config.validate()?;

        Ok(Self {
            name,
            config,
            handler,
        })
    }

    pub async fn run(
        self,
        mut tickers_rx: watch::Receiver<Vec<ProviderTicker>>,
        result_tx: mpsc::Sender<PriceResponse>,
        token: CancellationToken,
    ) {
        let Self {
            name,
            config,
            handler,
        } = self;

        if config.enable_compression {
            warn!(provider = %name, "compression is not supported by the transport, ignoring");
        }

        loop {
            let tickers = tickers_rx.borrow_and_update().clone();

            let connection_token = token.child_token();
            let mut connections = Vec::new();
            for slice in tickers.chunks(config.max_subscriptions_per_connection) {
                let connection = Connection {
                    name: name.clone(),
                    config: config.clone(),
                    handler: handler.fresh(),
                    tickers: slice.to_vec(),
                    result_tx: result_tx.clone(),
                    token: connection_token.clone(),
                };
                connections.push(tokio::spawn(connection.run()));
            }

            if !tickers.is_empty() {
                debug!(
                    provider = %name,
                    connections = connections.len(),
                    subscriptions = tickers.len(),
                    "established connection set"
                );
            }

            tokio::select! {
                _ = token.cancelled() => {
                    connection_token.cancel();
                    for connection in connections {
                        let _ = connection.await;
                    }
                    debug!(provider = %name, "websocket supervisor cancelled");
                    return;
                }
                changed = tickers_rx.changed() => {
                    connection_token.cancel();
                    for connection in connections {
                        let _ = connection.await;
                    }
                    if changed.is_err() {
                        // Provider dropped the sender; nothing left to subscribe for.
                        return;
                    }
                    debug!(provider = %name, "ticker set changed, rebuilding connections");
                }
            }
        }
    }
}

/// Terminal outcome of one streaming session.
enum ConnectionOutcome {
    /// Connection died; dial again after the reconnection timeout.
    Reconnect,
    /// Explicit stop; close the socket and return.
    Shutdown,
}

/// State machine for a single endpoint connection:
/// Disconnected -> Handshaking -> Streaming -> (Reconnecting -> Disconnected | Shutdown).
struct Connection {
    name: SmolStr,
    config: WebSocketConfig,
    handler: Box<dyn PriceWsHandler>,
    tickers: Vec<ProviderTicker>,
    result_tx: mpsc::Sender<PriceResponse>,
    token: CancellationToken,
}

impl Connection {
    async fn run(mut self) {
        let endpoint = self.config.endpoints[0].url.clone();

        loop {
            let attempt = tokio::select! {
                _ = self.token.cancelled() => return,
                attempt = tokio::time::timeout(
                    self.config.handshake_timeout(),
                    connect(endpoint.as_str()),
                ) => attempt,
            };

            let websocket = match attempt {
                Ok(Ok(websocket)) => websocket,
                Ok(Err(error)) => {
                    warn!(provider = %self.name, %endpoint, %error, "failed to connect");
                    if !self.wait_reconnect().await {
                        return;
                    }
                    continue;
                }
                Err(_) => {
                    warn!(provider = %self.name, %endpoint, "handshake timed out");
                    if !self.wait_reconnect().await {
                        return;
                    }
                    continue;
                }
            };

            debug!(provider = %self.name, %endpoint, "connected");

            match self.streaming(websocket).await {
                ConnectionOutcome::Shutdown => return,
                ConnectionOutcome::Reconnect => {
                    // Drop in-flight subscription state before the next dial.
                    self.handler = self.handler.fresh();
                    if !self.wait_reconnect().await {
                        return;
                    }
                }
            }
        }
    }

    /// Wait out the reconnection timeout. Returns false if cancelled while waiting.
    async fn wait_reconnect(&self) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(self.config.reconnection_timeout()) => true,
        }
    }

    async fn streaming(&mut self, websocket: WebSocket) -> ConnectionOutcome {
        let (ws_sink, mut ws_stream) = websocket.split();

        let (sink_tx, sink_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_to_venue(
            self.name.clone(),
            ws_sink,
            sink_rx,
            self.config.write_timeout(),
        ));

        let outcome = self.stream_frames(&mut ws_stream, &sink_tx).await;

        // Dropping the sender lets the writer drain and exit before the socket halves are
        // released.
        drop(sink_tx);
        let _ = writer.await;
        outcome
    }

    async fn stream_frames(
        &mut self,
        ws_stream: &mut futures::stream::SplitStream<WebSocket>,
        sink_tx: &mpsc::UnboundedSender<WsMessage>,
    ) -> ConnectionOutcome {
        // Let the venue settle before subscribing.
        tokio::select! {
            _ = self.token.cancelled() => return ConnectionOutcome::Shutdown,
            _ = tokio::time::sleep(self.config.post_connection_timeout()) => {}
        }

        let messages = match self.handler.create_messages(&self.tickers) {
            Ok(messages) => messages,
            Err(error) => {
                warn!(provider = %self.name, %error, "failed to encode subscriptions");
                return ConnectionOutcome::Reconnect;
            }
        };

        for (index, message) in messages.into_iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = self.token.cancelled() => return ConnectionOutcome::Shutdown,
                    _ = tokio::time::sleep(self.config.write_interval()) => {}
                }
            }
            if sink_tx.send(message).is_err() {
                return ConnectionOutcome::Reconnect;
            }
        }

        let mut heartbeat = tokio::time::interval(self.config.ping_interval());
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat.tick().await;

        let mut read_errors = 0usize;
        let mut read_deadline = tokio::time::Instant::now() + self.config.read_timeout();

        loop {
            tokio::select! {
                _ = self.token.cancelled() => return ConnectionOutcome::Shutdown,
                _ = heartbeat.tick() => {
                    for message in self.handler.heartbeat_messages() {
                        if sink_tx.send(message).is_err() {
                            return ConnectionOutcome::Reconnect;
                        }
                    }
                }
                frame = tokio::time::timeout_at(read_deadline, ws_stream.next()) => match frame {
                    Err(_) => {
                        warn!(provider = %self.name, "no frames within read timeout, reconnecting");
                        return ConnectionOutcome::Reconnect;
                    }
                    Ok(None) => {
                        debug!(provider = %self.name, "stream ended");
                        return ConnectionOutcome::Reconnect;
                    }
                    Ok(Some(Err(error))) => {
                        read_errors += 1;
                        warn!(provider = %self.name, %error, read_errors, "websocket read error");
                        if read_errors > self.config.max_read_error_count {
                            return ConnectionOutcome::Reconnect;
                        }
                    }
                    Ok(Some(Ok(message))) => {
                        read_errors = 0;
                        read_deadline = tokio::time::Instant::now() + self.config.read_timeout();

                        if let WsMessage::Close(frame) = &message {
                            debug!(provider = %self.name, ?frame, "received close frame");
                            return ConnectionOutcome::Reconnect;
                        }

                        if let Some(payload) = text_payload(&message) {
                            match self.handler.handle_message(payload) {
                                Err(error) => {
                                    debug!(
                                        provider = %self.name,
                                        %error,
                                        payload,
                                        "dropping unclassifiable frame"
                                    );
                                }
                                Ok(handled) => {
                                    for reply in handled.replies {
                                        if sink_tx.send(reply).is_err() {
                                            return ConnectionOutcome::Reconnect;
                                        }
                                    }
                                    if let Some(response) = handled.response {
                                        // Never block the read path on the merger.
                                        match self.result_tx.try_send(response) {
                                            Ok(()) => {}
                                            Err(TrySendError::Full(_)) => {
                                                warn!(
                                                    provider = %self.name,
                                                    "result channel full, dropping response"
                                                );
                                            }
                                            Err(TrySendError::Closed(_)) => {
                                                return ConnectionOutcome::Shutdown;
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Transmit [`WsMessage`]s produced by the handler and heartbeat schedule to the venue via
/// the [`WsSink`].
async fn write_to_venue(
    name: SmolStr,
    mut ws_sink: WsSink,
    mut sink_rx: mpsc::UnboundedReceiver<WsMessage>,
    write_timeout: Duration,
) {
    while let Some(message) = sink_rx.recv().await {
        match tokio::time::timeout(write_timeout, ws_sink.send(message)).await {
            Err(_) => {
                warn!(provider = %name, "write timed out");
                break;
            }
            Ok(Err(error)) => {
                if is_disconnect(&error) {
                    break;
                }

                // The socket is still up, so a failed send is worth surfacing.
                error!(provider = %name, %error, "failed to send message to venue");
            }
            Ok(Ok(())) => {}
        }
    }
}

/// A write failing with one of these means the socket is already gone; the session falls
/// back to its reconnect path rather than reporting the send.
fn is_disconnect(error: &WsError) -> bool {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_) => true,
        WsError::Protocol(protocol) => matches!(protocol, ProtocolError::SendAfterClosing),
        _ => false,
    }
}
