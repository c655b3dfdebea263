use crate::{
    config::{ApiConfig, Endpoint},
    error::{DataError, ProviderError},
    handler::PriceApiHandler,
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::ProviderTicker,
};
use chrono::Utc;
use reqwest::StatusCode;
use rust_decimal::Decimal;

/// Name of the volatile test provider.
pub const NAME: &str = "volatile_api";

/// Placeholder endpoint - the handler prices every ticker without reading the response.
pub const URL: &str = "volatile-exchange-url";

/// Default configuration for the volatile test provider.
pub fn default_api_config() -> ApiConfig {
    ApiConfig {
        name: NAME.into(),
        enabled: true,
        atomic: false,
        timeout_ms: 3_000,
        interval_ms: 500,
        reconnect_timeout_ms: 2_000,
        max_queries: 100,
        endpoints: vec![Endpoint::new(URL)],
    }
}

/// [`PriceApiHandler`] that deterministically prices every ticker it is asked about.
///
/// Used in tests and load exercises where downstream consumers need to observe moving
/// prices without any venue being reachable. The price is a sawtooth around 100 derived
/// from wall-clock seconds, so consecutive ticks disagree.
#[derive(Debug)]
pub struct VolatileApiHandler {
    api: ApiConfig,
}

impl VolatileApiHandler {
    pub fn new(api: ApiConfig) -> Result<Self, DataError> {
        if api.name != NAME {
            return Err(DataError::config(
                NAME,
                format!("expected api config name {NAME}, got {}", api.name),
            ));
        }
        if !api.enabled {
            return Err(DataError::config(NAME, "api config is not enabled"));
        }
        api.validate()?;

        Ok(Self { api })
    }
}

impl PriceApiHandler for VolatileApiHandler {
    fn create_url(&self, _tickers: &[ProviderTicker]) -> Result<String, ProviderError> {
        Ok(self.api.endpoints[0].url.clone())
    }

    fn parse_response(
        &self,
        tickers: &[ProviderTicker],
        _status: StatusCode,
        _payload: &[u8],
    ) -> PriceResponse {
        let time = Utc::now();
        // 100.00 .. 129.75 in 25-cent steps, one step per second.
        let price = Decimal::new(10_000 + (time.timestamp() % 120) * 25, 2);

        let resolved: ResolvedPrices = tickers
            .iter()
            .map(|ticker| (ticker.clone(), PriceResult::new(price, time)))
            .collect();

        PriceResponse::new(resolved, UnresolvedPrices::default())
    }
}
