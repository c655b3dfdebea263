use crate::{
    config::ApiConfig,
    error::{DataError, ErrorCode, ProviderError},
    marketmap::{
        Chain, MarketMapFetcher, MarketMapResponse, mainnet::MainnetMarketMapFetcher,
        research::ResearchMarketMapFetcher,
    },
    venues::coinmarketcap,
};
use async_trait::async_trait;
use lodestone_market::MarketMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Aggregates the mainnet and research market-map sources into one authoritative map.
///
/// Both sources are queried concurrently. Mainnet is authoritative: if it fails, its
/// failure is returned verbatim and the research result is discarded. On success the
/// research map may only *add* markets - mainnet entries are never overwritten.
///
/// With `cmc_only` set the combined map is projected onto CoinMarketCap before
/// publication: every market keeps exactly its CMC binding (or the static catalogue
/// entry), and markets without either are dropped.
pub struct MultiMarketMapFetcher {
    mainnet: Arc<dyn MarketMapFetcher>,
    research: Arc<dyn MarketMapFetcher>,
    chain: Chain,
    cmc_only: bool,
}

impl std::fmt::Debug for MultiMarketMapFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiMarketMapFetcher")
            .field("chain", &self.chain)
            .field("cmc_only", &self.cmc_only)
            .finish()
    }
}

impl MultiMarketMapFetcher {
    pub fn new(
        mainnet: Arc<dyn MarketMapFetcher>,
        research: Arc<dyn MarketMapFetcher>,
        chain: Chain,
        cmc_only: bool,
    ) -> Self {
        Self {
            mainnet,
            research,
            chain,
            cmc_only,
        }
    }

    /// Construct both sub-fetchers from one API config carrying exactly two endpoints:
    /// the chain REST endpoint first, the research document URL second.
    pub fn from_api_config(
        api: &ApiConfig,
        chain: Chain,
        cmc_only: bool,
    ) -> Result<Self, DataError> {
        if !api.enabled {
            return Err(DataError::config(&api.name, "api config is not enabled"));
        }
        api.validate()?;

        let [mainnet_endpoint, research_endpoint] = api.endpoints.as_slice() else {
            return Err(DataError::config(
                &api.name,
                format!("expected two endpoints, got {}", api.endpoints.len()),
            ));
        };

        let mainnet = MainnetMarketMapFetcher::new(
            mainnet_endpoint.clone(),
            api.timeout(),
            chain.clone(),
        )?;
        let research = ResearchMarketMapFetcher::new(
            research_endpoint.clone(),
            api.timeout(),
            chain.clone(),
        )?;

        Ok(Self::new(
            Arc::new(mainnet),
            Arc::new(research),
            chain,
            cmc_only,
        ))
    }
}

#[async_trait]
impl MarketMapFetcher for MultiMarketMapFetcher {
    async fn fetch(&self, chains: &[Chain]) -> MarketMapResponse {
        let (mainnet_response, research_response) =
            tokio::join!(self.mainnet.fetch(chains), self.research.fetch(chains));

        // Mainnet failure is authoritative; the research result is discarded with it.
        if mainnet_response.unresolved.contains_key(&self.chain) {
            error!(chain = %self.chain, "mainnet market-map fetch failed");
            return mainnet_response;
        }

        let Some(mainnet_resolved) = mainnet_response.resolved.get(&self.chain) else {
            return MarketMapResponse::with_err(
                chains,
                ProviderError::new(
                    ErrorCode::Unknown,
                    format!("mainnet fetch produced nothing for chain {}", self.chain),
                ),
            );
        };

        let mut combined = mainnet_resolved.value.clone();

        match research_response.resolved.get(&self.chain) {
            Some(research_resolved) => {
                for (ticker, market) in &research_resolved.value.markets {
                    if !combined.markets.contains_key(ticker) {
                        debug!(%ticker, "adding market from research");
                        combined.markets.insert(ticker.clone(), market.clone());
                    }
                }
            }
            // Research neither resolved the chain nor stayed silent about it - surface
            // its failure verbatim.
            None => return research_response,
        }

        if self.cmc_only {
            project_cmc_only(&mut combined);
        }

        if let Err(validation_error) = combined.validate() {
            error!(%validation_error, "combined market map failed validation");
            return MarketMapResponse::with_err(
                chains,
                ProviderError::new(
                    ErrorCode::Unknown,
                    format!("combined market map failed validation: {validation_error}"),
                ),
            );
        }

        MarketMapResponse::resolved(self.chain.clone(), combined, mainnet_resolved.time)
    }
}

/// Reduce a market map to its CoinMarketCap projection.
///
/// Every surviving market requires a single provider; a market's own CMC binding wins
/// over the static catalogue; markets known to neither are removed.
fn project_cmc_only(market_map: &mut MarketMap) {
    market_map.markets.retain(|ticker, market| {
        market.ticker.min_provider_count = 1;

        if let Some(cmc) = market
            .provider_configs
            .iter()
            .find(|config| config.name == coinmarketcap::NAME)
        {
            market.provider_configs = vec![cmc.clone()];
            return true;
        }

        match coinmarketcap::static_provider_config(ticker) {
            Some(config) => {
                market.provider_configs = vec![config];
                true
            }
            None => {
                debug!(%ticker, "no CoinMarketCap binding, dropping market");
                false
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lodestone_market::{CurrencyPair, Market, ProviderConfig, Ticker};

    struct StaticFetcher(MarketMapResponse);

    #[async_trait]
    impl MarketMapFetcher for StaticFetcher {
        async fn fetch(&self, _chains: &[Chain]) -> MarketMapResponse {
            self.0.clone()
        }
    }

    fn chain() -> Chain {
        Chain::new("lodestone-1")
    }

    fn market(pair: (&str, &str), venue: &str, off_chain: &str) -> Market {
        Market {
            ticker: Ticker::new(CurrencyPair::new(pair.0, pair.1), 8, 1, true),
            provider_configs: vec![ProviderConfig {
                name: venue.into(),
                off_chain_ticker: off_chain.into(),
                invert: false,
                normalize_by_pair: None,
                metadata_json: String::new(),
            }],
        }
    }

    fn resolved_response(markets: Vec<Market>) -> MarketMapResponse {
        let mut market_map = MarketMap::default();
        for entry in markets {
            market_map.insert(entry);
        }
        MarketMapResponse::resolved(chain(), market_map, Utc::now())
    }

    fn unresolved_response(code: ErrorCode) -> MarketMapResponse {
        MarketMapResponse::with_err(&[chain()], ProviderError::new(code, "fetch failed"))
    }

    fn fetcher(
        mainnet: MarketMapResponse,
        research: MarketMapResponse,
        cmc_only: bool,
    ) -> MultiMarketMapFetcher {
        MultiMarketMapFetcher::new(
            Arc::new(StaticFetcher(mainnet)),
            Arc::new(StaticFetcher(research)),
            chain(),
            cmc_only,
        )
    }

    #[tokio::test]
    async fn test_merge_is_left_biased() {
        let mainnet_market = market(("BTC", "USD"), "binance_ws", "BTCUSDT");
        let research_market = market(("ETH", "USD"), "coinbase_ws", "ETH-USD");

        let fetcher = fetcher(
            resolved_response(vec![mainnet_market.clone()]),
            resolved_response(vec![
                research_market.clone(),
                // Research's view of BTC/USD must not overwrite mainnet's.
                market(("BTC", "USD"), "okx_ws", "BTC-USDT"),
            ]),
            false,
        );

        let response = fetcher.fetch(&[chain()]).await;
        let combined = &response.resolved.get(&chain()).unwrap().value;

        assert_eq!(combined.markets.len(), 2);
        assert_eq!(combined.get("BTC/USD").unwrap(), &mainnet_market);
        assert_eq!(combined.get("ETH/USD").unwrap(), &research_market);
    }

    #[tokio::test]
    async fn test_mainnet_failure_returned_verbatim() {
        let mainnet = unresolved_response(ErrorCode::ApiGeneral);
        let fetcher = fetcher(
            mainnet.clone(),
            resolved_response(vec![market(("ETH", "USD"), "coinbase_ws", "ETH-USD")]),
            false,
        );

        let response = fetcher.fetch(&[chain()]).await;
        assert_eq!(response, mainnet);
    }

    #[tokio::test]
    async fn test_research_failure_returned_verbatim() {
        let research = unresolved_response(ErrorCode::FailedToDecode);
        let fetcher = fetcher(
            resolved_response(vec![market(("BTC", "USD"), "binance_ws", "BTCUSDT")]),
            research.clone(),
            false,
        );

        let response = fetcher.fetch(&[chain()]).await;
        assert_eq!(response, research);
    }

    #[tokio::test]
    async fn test_cmc_only_projection() {
        let mut btc = market(("BTC", "USD"), "binance_ws", "BTCUSDT");
        btc.ticker.min_provider_count = 1;
        // FOO/USD has no CMC binding and is absent from the static catalogue.
        let foo = market(("FOO", "USD"), "binance_ws", "FOOUSDT");
        // BAR/USD carries its own CMC binding, which must win over the catalogue.
        let mut bar = market(("BAR", "USD"), "binance_ws", "BARUSDT");
        bar.provider_configs.push(ProviderConfig {
            name: coinmarketcap::NAME.into(),
            off_chain_ticker: "9999".into(),
            invert: false,
            normalize_by_pair: None,
            metadata_json: String::new(),
        });

        let fetcher = fetcher(
            resolved_response(vec![btc, foo, bar]),
            resolved_response(vec![]),
            true,
        );

        let response = fetcher.fetch(&[chain()]).await;
        let combined = &response.resolved.get(&chain()).unwrap().value;

        assert!(combined.get("FOO/USD").is_none());

        let btc = combined.get("BTC/USD").unwrap();
        assert_eq!(btc.ticker.min_provider_count, 1);
        assert_eq!(btc.provider_configs.len(), 1);
        assert_eq!(btc.provider_configs[0].name, coinmarketcap::NAME);
        assert_eq!(btc.provider_configs[0].off_chain_ticker, "1");

        let bar = combined.get("BAR/USD").unwrap();
        assert_eq!(bar.provider_configs.len(), 1);
        assert_eq!(bar.provider_configs[0].off_chain_ticker, "9999");
    }

    #[tokio::test]
    async fn test_combined_validation_failure_is_unknown() {
        // Research contributes a market whose normalize-by pair exists nowhere.
        let mut broken = market(("ETH", "USD"), "okx_ws", "ETH-USDT");
        broken.provider_configs[0].normalize_by_pair = Some(CurrencyPair::new("USDT", "USD"));

        let fetcher = fetcher(
            resolved_response(vec![market(("BTC", "USD"), "binance_ws", "BTCUSDT")]),
            resolved_response(vec![broken]),
            false,
        );

        let response = fetcher.fetch(&[chain()]).await;
        let error = response.unresolved.get(&chain()).unwrap();
        assert_eq!(error.code(), ErrorCode::Unknown);
    }
}
