use crate::{
    config::{ApiConfig, WebSocketConfig},
    connector::WsDriver,
    error::DataError,
    fetcher::ApiDriver,
    handler::{PriceApiHandler, PriceWsHandler},
    response::{PriceResponse, ResultTable, TickerResult},
    ticker::ProviderTicker,
};
use fnv::FnvHashSet;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result channel capacity for API providers, which produce at most one response per
/// batch per tick.
const API_RESULT_BUFFER: usize = 256;

/// A running connector for one venue.
///
/// The provider owns the working ticker set and the [`ResultTable`]; its connector
/// ([`ApiDriver`] or [`WsDriver`]) owns the transport. Results flow over a bounded channel
/// into the provider's single merger task, so the table has exactly one writer.
///
/// [`Self::run`] blocks until [`Self::stop`] cancels it and may be called once per
/// instance.
#[derive(Debug)]
pub struct PriceProvider {
    name: SmolStr,
    tickers_tx: watch::Sender<Vec<ProviderTicker>>,
    results: RwLock<ResultTable>,
    token: CancellationToken,
    driver: Mutex<Option<Driver>>,
    result_buffer: usize,
}

#[derive(Debug)]
enum Driver {
    Api(ApiDriver),
    Ws(WsDriver),
}

impl PriceProvider {
    /// Construct a provider around a request/response API connector.
    pub fn api(
        name: SmolStr,
        config: ApiConfig,
        handler: Box<dyn PriceApiHandler>,
        tickers: Vec<ProviderTicker>,
    ) -> Result<Self, DataError> {
        let driver = ApiDriver::new(name.clone(), config, handler)?;
        Ok(Self::with_driver(
            name,
            Driver::Api(driver),
            tickers,
            API_RESULT_BUFFER,
        ))
    }

    /// Construct a provider around a persistent WebSocket connector.
    pub fn websocket(
        name: SmolStr,
        config: WebSocketConfig,
        handler: Box<dyn PriceWsHandler>,
        tickers: Vec<ProviderTicker>,
    ) -> Result<Self, DataError> {
        let result_buffer = config.result_buffer();
        let driver = WsDriver::new(name.clone(), config, handler)?;
        Ok(Self::with_driver(
            name,
            Driver::Ws(driver),
            tickers,
            result_buffer,
        ))
    }

    fn with_driver(
        name: SmolStr,
        driver: Driver,
        tickers: Vec<ProviderTicker>,
        result_buffer: usize,
    ) -> Self {
        Self {
            name,
            tickers_tx: watch::Sender::new(tickers),
            results: RwLock::new(ResultTable::default()),
            token: CancellationToken::new(),
            driver: Mutex::new(Some(driver)),
            result_buffer,
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    /// Current working ticker set.
    pub fn tickers(&self) -> Vec<ProviderTicker> {
        self.tickers_tx.borrow().clone()
    }

    /// Atomically swap the working ticker set. The next tick / subscription rebuild
    /// observes the update. Table entries for tickers leaving the set are pruned so the
    /// snapshot never reports retired pairs.
    pub fn update(&self, tickers: Vec<ProviderTicker>) {
        {
            let keep: FnvHashSet<SmolStr> =
                tickers.iter().map(|ticker| ticker.ticker().clone()).collect();
            self.results.write().retain(|ticker, _| keep.contains(ticker));
        }
        self.tickers_tx.send_replace(tickers);
    }

    /// Run the provider until [`Self::stop`] is called.
    ///
    /// Spawns the connector, then becomes the single writer funnelling its
    /// [`PriceResponse`]s into the result table.
    pub async fn run(&self) {
        let Some(driver) = self.driver.lock().take() else {
            warn!(provider = %self.name, "run called more than once, ignoring");
            return;
        };

        let (result_tx, mut result_rx) = mpsc::channel(self.result_buffer);
        let tickers_rx = self.tickers_tx.subscribe();
        let driver_token = self.token.child_token();

        let driver_task = match driver {
            Driver::Api(api) => tokio::spawn(api.run(tickers_rx, result_tx, driver_token.clone())),
            Driver::Ws(ws) => tokio::spawn(ws.run(tickers_rx, result_tx, driver_token.clone())),
        };

        debug!(provider = %self.name, "started");

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                response = result_rx.recv() => match response {
                    Some(response) => self.merge(response),
                    None => break,
                }
            }
        }

        driver_token.cancel();
        let _ = driver_task.await;
        debug!(provider = %self.name, "stopped");
    }

    /// Cancel the provider and its connector.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Point-in-time deep copy of the result table.
    pub fn get_data(&self) -> ResultTable {
        self.results.read().clone()
    }

    /// Merge one connector response into the result table.
    ///
    /// Within one ticker the later observation timestamp wins; on equal timestamps the
    /// later arrival wins. Unresolved results always replace the previous entry - a stale
    /// price must not mask a failing venue.
    fn merge(&self, response: PriceResponse) {
        let mut results = self.results.write();

        for (ticker, result) in response.resolved {
            if let Some(TickerResult::Resolved(existing)) = results.get(ticker.ticker()) {
                if existing.time > result.time {
                    continue;
                }
            }
            results.insert(ticker.ticker().clone(), TickerResult::Resolved(result));
        }

        for (ticker, error) in response.unresolved {
            debug!(provider = %self.name, %ticker, %error, "unresolved result");
            results.insert(ticker.ticker().clone(), TickerResult::Unresolved(error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ProviderError};
    use crate::response::{PriceResult, ResolvedPrices, UnresolvedPrices};
    use crate::venues;
    use chrono::{TimeDelta, Utc};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn offline_provider(tickers: Vec<ProviderTicker>) -> PriceProvider {
        let mut config = venues::bingx::default_api_config();
        config.endpoints[0].url = "http://127.0.0.1:1/price?symbol=%s".to_string();
        let handler = venues::api_handler(venues::bingx::NAME, &config).unwrap();
        PriceProvider::api(venues::bingx::NAME.into(), config, handler, tickers).unwrap()
    }

    fn resolved_response(ticker: &ProviderTicker, result: PriceResult) -> PriceResponse {
        let mut resolved = ResolvedPrices::default();
        resolved.insert(ticker.clone(), result);
        PriceResponse::new(resolved, UnresolvedPrices::default())
    }

    #[test]
    fn test_merge_later_timestamp_wins() {
        let ticker = ProviderTicker::new("BTC/USD", "BTC-USDT", "");
        let provider = offline_provider(vec![ticker.clone()]);

        let earlier = Utc::now();
        let later = earlier + TimeDelta::seconds(1);

        provider.merge(resolved_response(
            &ticker,
            PriceResult::new(dec!(42000.5), later),
        ));
        provider.merge(resolved_response(
            &ticker,
            PriceResult::new(dec!(41000.0), earlier),
        ));

        match provider.get_data().get("BTC/USD") {
            Some(TickerResult::Resolved(result)) => assert_eq!(result.price, dec!(42000.5)),
            other => panic!("expected resolved result, got {other:?}"),
        }

        // Equal timestamps: the later arrival wins.
        provider.merge(resolved_response(
            &ticker,
            PriceResult::new(dec!(43000.0), later),
        ));
        match provider.get_data().get("BTC/USD") {
            Some(TickerResult::Resolved(result)) => assert_eq!(result.price, dec!(43000.0)),
            other => panic!("expected resolved result, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_unresolved_replaces_resolved() {
        let ticker = ProviderTicker::new("BTC/USD", "BTC-USDT", "");
        let provider = offline_provider(vec![ticker.clone()]);

        provider.merge(resolved_response(
            &ticker,
            PriceResult::new(dec!(42000.5), Utc::now()),
        ));

        let mut unresolved = UnresolvedPrices::default();
        unresolved.insert(
            ticker.clone(),
            ProviderError::new(ErrorCode::ApiGeneral, "connection refused"),
        );
        provider.merge(PriceResponse::new(ResolvedPrices::default(), unresolved));

        match provider.get_data().get("BTC/USD") {
            Some(TickerResult::Unresolved(error)) => {
                assert_eq!(error.code(), ErrorCode::ApiGeneral)
            }
            other => panic!("expected unresolved result, got {other:?}"),
        }
    }

    #[test]
    fn test_update_prunes_retired_tickers() {
        let btc = ProviderTicker::new("BTC/USD", "BTC-USDT", "");
        let eth = ProviderTicker::new("ETH/USD", "ETH-USDT", "");
        let provider = offline_provider(vec![btc.clone(), eth.clone()]);

        provider.merge(resolved_response(
            &btc,
            PriceResult::new(dec!(42000.5), Utc::now()),
        ));
        provider.merge(resolved_response(
            &eth,
            PriceResult::new(dec!(2500.0), Utc::now()),
        ));

        provider.update(vec![eth.clone()]);

        let data = provider.get_data();
        assert!(data.get("BTC/USD").is_none());
        assert!(data.get("ETH/USD").is_some());
        assert_eq!(provider.tickers(), vec![eth]);
    }

    #[tokio::test]
    async fn test_run_blocks_until_stopped_and_is_single_use() {
        let provider = std::sync::Arc::new(offline_provider(vec![]));

        let runner = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.run().await })
        };

        // Give the run loop a moment to start, then stop it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        provider.stop();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("run must return after stop")
            .unwrap();

        // A second run returns immediately: the driver was consumed.
        tokio::time::timeout(Duration::from_secs(1), provider.run())
            .await
            .expect("second run must be a no-op");
    }
}
