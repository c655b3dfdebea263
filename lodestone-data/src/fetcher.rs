use crate::{
    config::ApiConfig,
    error::{DataError, ErrorCode, ProviderError},
    handler::PriceApiHandler,
    response::PriceResponse,
    ticker::ProviderTicker,
};
use lodestone_integration::protocol::rest::RestClient;
use smol_str::SmolStr;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Drives a [`PriceApiHandler`] on a fixed-rate tick loop.
///
/// Each tick reads the provider's current ticker set, splits it into batches (singletons
/// for atomic handlers, `max_queries`-sized chunks otherwise), executes the batch requests
/// concurrently, and forwards every [`PriceResponse`] to the owning provider. A failed
/// tick never terminates the loop.
#[derive(Debug)]
pub(crate) struct ApiDriver {
    name: SmolStr,
    config: ApiConfig,
    handler: Box<dyn PriceApiHandler>,
    client: RestClient,
}

impl ApiDriver {
    pub fn new(
        name: SmolStr,
        config: ApiConfig,
        handler: Box<dyn PriceApiHandler>,
    ) -> Result<Self, DataError> {
        config.validate()?;
        let client = RestClient::new(config.timeout())?;

        Ok(Self {
            name,
            config,
            handler,
            client,
        })
    }

    pub async fn run(
        self,
        tickers_rx: watch::Receiver<Vec<ProviderTicker>>,
        result_tx: mpsc::Sender<PriceResponse>,
        token: CancellationToken,
    ) {
        let mut tick = tokio::time::interval(self.config.interval());
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(provider = %self.name, "api fetch loop cancelled");
                    return;
                }
                _ = tick.tick() => {}
            }

            let tickers = tickers_rx.borrow().clone();
            if tickers.is_empty() {
                continue;
            }

            let batch_size = if self.config.atomic {
                1
            } else {
                self.config.max_queries
            };

            let fetches = tickers.chunks(batch_size).map(|batch| self.fetch_batch(batch));
            let responses = futures::future::join_all(fetches).await;

            let mut transport_failures = 0;
            let total = responses.len();
            for response in responses {
                if response
                    .unresolved
                    .values()
                    .any(|error| error.code() == ErrorCode::ApiGeneral)
                {
                    transport_failures += 1;
                }
                if result_tx.send(response).await.is_err() {
                    // Provider merger is gone; nothing left to feed.
                    return;
                }
            }

            // A tick in which every request died at the transport level usually means the
            // endpoint itself is down. Back off before hammering it again.
            if transport_failures == total {
                warn!(
                    provider = %self.name,
                    "all requests failed this tick, backing off"
                );
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(self.config.reconnect_timeout()) => {}
                }
            }
        }
    }

    async fn fetch_batch(&self, tickers: &[ProviderTicker]) -> PriceResponse {
        let url = match self.handler.create_url(tickers) {
            Ok(url) => url,
            Err(error) => return PriceResponse::with_err(tickers, error),
        };

        match self.client.get(&url).await {
            Err(error) => {
                warn!(provider = %self.name, %error, "request failed");
                PriceResponse::with_err(
                    tickers,
                    ProviderError::new(ErrorCode::ApiGeneral, error.to_string()),
                )
            }
            Ok((status, payload)) if !status.is_success() => PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::InvalidResponse,
                    format!(
                        "status {status}: {}",
                        String::from_utf8_lossy(&payload[..payload.len().min(256)])
                    ),
                ),
            ),
            Ok((status, payload)) => self.handler.parse_response(tickers, status, &payload),
        }
    }
}
