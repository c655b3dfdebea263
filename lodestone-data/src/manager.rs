use crate::{
    config::{ConfigKind, OracleConfig},
    error::DataError,
    provider::PriceProvider,
    response::{PriceResult, TickerResult},
    ticker::ProviderTicker,
    venues,
};
use fnv::FnvHashMap;
use lodestone_market::MarketMap;
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::debug;

/// A provider plus its restricted view of the market map.
///
/// A provider is *enabled* iff its view is non-empty. Disabling never tears the provider
/// down - it keeps running with an empty subscription set so re-enabling is a ticker-set
/// swap, not a restart.
#[derive(Debug)]
struct ProviderState {
    provider: Arc<PriceProvider>,
    tickers: Vec<ProviderTicker>,
    enabled: bool,
}

#[derive(Debug)]
struct ManagerState {
    providers: FnvHashMap<SmolStr, ProviderState>,
    market_map: MarketMap,
}

/// Instantiates price providers from config and reconciles their enablement against the
/// current market map.
///
/// All mutations serialize through one mutex; reads briefly take the same mutex to copy
/// out handles.
#[derive(Debug)]
pub struct ProviderManager {
    state: Mutex<ManagerState>,
}

impl ProviderManager {
    /// Construct every configured price provider against the provided market map.
    ///
    /// Fails hard on config validation errors, factory errors, and venues with no enabled
    /// transport. Market-map-typed venues are skipped - those are driven by the
    /// market-map fetchers, not this manager.
    pub fn new(config: &OracleConfig, market_map: MarketMap) -> Result<Self, DataError> {
        config.validate()?;
        market_map.validate()?;

        let mut providers = FnvHashMap::default();
        for venue in &config.venues {
            if venue.kind != ConfigKind::Price {
                continue;
            }

            let tickers = venue_tickers(&venue.name, &market_map);

            let provider = match (&venue.api, &venue.websocket) {
                (Some(api), _) if api.enabled => {
                    let handler = venues::api_handler(&venue.name, api)?;
                    PriceProvider::api(venue.name.clone(), api.clone(), handler, tickers.clone())?
                }
                (_, Some(websocket)) if websocket.enabled => {
                    let handler = venues::ws_handler(&venue.name, websocket)?;
                    PriceProvider::websocket(
                        venue.name.clone(),
                        websocket.clone(),
                        handler,
                        tickers.clone(),
                    )?
                }
                _ => return Err(DataError::NoTransport(venue.name.clone())),
            };

            let enabled = !tickers.is_empty();
            debug!(venue = %venue.name, tickers = tickers.len(), enabled, "initialised provider");

            providers.insert(
                venue.name.clone(),
                ProviderState {
                    provider: Arc::new(provider),
                    tickers,
                    enabled,
                },
            );
        }

        Ok(Self {
            state: Mutex::new(ManagerState {
                providers,
                market_map,
            }),
        })
    }

    /// Handles of every currently enabled provider.
    pub fn providers(&self) -> Vec<Arc<PriceProvider>> {
        let state = self.state.lock();
        state
            .providers
            .values()
            .filter(|provider_state| provider_state.enabled)
            .map(|provider_state| provider_state.provider.clone())
            .collect()
    }

    /// Handles of every provider, enabled or not. Used by embedders to spawn the
    /// provider run loops once at startup.
    pub fn all_providers(&self) -> Vec<Arc<PriceProvider>> {
        let state = self.state.lock();
        state
            .providers
            .values()
            .map(|provider_state| provider_state.provider.clone())
            .collect()
    }

    /// Recompute every provider's view against a refreshed market map.
    ///
    /// Providers whose view changed receive an [`PriceProvider::update`]; views becoming
    /// empty disable the provider, views becoming non-empty re-enable it.
    pub fn update_market_map(&self, market_map: MarketMap) -> Result<(), DataError> {
        market_map.validate()?;

        let mut state = self.state.lock();
        for (name, provider_state) in state.providers.iter_mut() {
            let tickers = venue_tickers(name, &market_map);

            if tickers != provider_state.tickers {
                debug!(venue = %name, tickers = tickers.len(), "ticker view changed");
                provider_state.provider.update(tickers.clone());
                provider_state.tickers = tickers;
            }
            provider_state.enabled = !provider_state.tickers.is_empty();
        }
        state.market_map = market_map;

        Ok(())
    }

    /// The market map the manager last reconciled against.
    pub fn market_map(&self) -> MarketMap {
        self.state.lock().market_map.clone()
    }

    /// Union of the enabled providers' resolved prices, freshest observation per ticker.
    ///
    /// Snapshot-consistent per provider; unresolved entries are left to min-provider-count
    /// filtering downstream and omitted here.
    pub fn latest_prices(&self) -> FnvHashMap<SmolStr, PriceResult> {
        let providers = self.providers();

        let mut prices: FnvHashMap<SmolStr, PriceResult> = FnvHashMap::default();
        for provider in providers {
            for (ticker, result) in provider.get_data() {
                if let TickerResult::Resolved(result) = result {
                    match prices.get(&ticker) {
                        Some(existing) if existing.time >= result.time => {}
                        _ => {
                            prices.insert(ticker, result);
                        }
                    }
                }
            }
        }

        prices
    }
}

/// One venue's view of a market map: a [`ProviderTicker`] for every enabled market that
/// binds the venue.
fn venue_tickers(venue: &str, market_map: &MarketMap) -> Vec<ProviderTicker> {
    market_map
        .markets
        .values()
        .filter(|market| market.ticker.enabled)
        .flat_map(|market| {
            market
                .provider_configs
                .iter()
                .filter(|config| config.name == venue)
                .map(|config| {
                    ProviderTicker::new(
                        SmolStr::new(market.ticker.to_string()),
                        config.off_chain_ticker.clone(),
                        config.metadata_json.clone(),
                    )
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VenueConfig;
    use lodestone_market::{CurrencyPair, Market, ProviderConfig, Ticker};

    fn market(pair: (&str, &str), configs: Vec<(&str, &str)>) -> Market {
        Market {
            ticker: Ticker::new(CurrencyPair::new(pair.0, pair.1), 8, 1, true),
            provider_configs: configs
                .into_iter()
                .map(|(name, off_chain)| ProviderConfig {
                    name: name.into(),
                    off_chain_ticker: off_chain.into(),
                    invert: false,
                    normalize_by_pair: None,
                    metadata_json: String::new(),
                })
                .collect(),
        }
    }

    fn config() -> OracleConfig {
        OracleConfig {
            venues: vec![
                VenueConfig::api(
                    venues::bingx::NAME,
                    venues::bingx::default_api_config(),
                    ConfigKind::Price,
                ),
                VenueConfig::websocket(
                    venues::bitget::NAME,
                    venues::bitget::default_websocket_config(),
                    ConfigKind::Price,
                ),
            ],
        }
    }

    #[test]
    fn test_new_enables_only_venues_with_markets() {
        let mut market_map = MarketMap::default();
        market_map.insert(market(
            ("BTC", "USD"),
            vec![(venues::bingx::NAME, "BTC-USDT")],
        ));

        let manager = ProviderManager::new(&config(), market_map).unwrap();

        let enabled = manager.providers();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name(), venues::bingx::NAME);
        assert_eq!(manager.all_providers().len(), 2);
    }

    #[test]
    fn test_new_rejects_unknown_venue() {
        let mut bad = config();
        bad.venues[0].name = "acme_api".into();

        assert!(matches!(
            ProviderManager::new(&bad, MarketMap::default()),
            Err(DataError::UnknownVenue(_))
        ));
    }

    #[test]
    fn test_update_market_map_flips_enablement() {
        let mut market_map = MarketMap::default();
        market_map.insert(market(
            ("BTC", "USD"),
            vec![(venues::bingx::NAME, "BTC-USDT")],
        ));

        let manager = ProviderManager::new(&config(), market_map).unwrap();
        assert_eq!(manager.providers().len(), 1);

        // The refreshed map moves the market to the websocket venue.
        let mut refreshed = MarketMap::default();
        refreshed.insert(market(
            ("BTC", "USD"),
            vec![(venues::bitget::NAME, "BTCUSDT")],
        ));
        manager.update_market_map(refreshed).unwrap();

        let enabled = manager.providers();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name(), venues::bitget::NAME);
        assert_eq!(enabled[0].tickers().len(), 1);
    }

    #[test]
    fn test_venue_tickers_skips_disabled_markets() {
        let mut disabled = market(("BTC", "USD"), vec![(venues::bingx::NAME, "BTC-USDT")]);
        disabled.ticker.enabled = false;

        let mut market_map = MarketMap::default();
        market_map.insert(disabled);

        assert!(venue_tickers(venues::bingx::NAME, &market_map).is_empty());
    }
}
