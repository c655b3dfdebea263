use crate::{
    config::{ApiConfig, Endpoint},
    error::{DataError, ErrorCode, ProviderError},
    handler::PriceApiHandler,
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::ProviderTicker,
};
use chrono::Utc;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Name of the BingX price provider.
pub const NAME: &str = "bingx_api";

/// Spot price endpoint template. The venue symbol is substituted for `%s`.
pub const URL: &str = "https://open-api.bingx.com/openApi/spot/v1/ticker/price?symbol=%s";

/// Default configuration for the BingX API.
pub fn default_api_config() -> ApiConfig {
    ApiConfig {
        name: NAME.into(),
        enabled: true,
        atomic: true,
        timeout_ms: 3_000,
        interval_ms: 750,
        reconnect_timeout_ms: 2_000,
        max_queries: 1,
        endpoints: vec![Endpoint::new(URL)],
    }
}

#[derive(Debug, Deserialize)]
struct BingxResponse {
    code: i64,
    #[serde(default)]
    data: Vec<BingxData>,
}

#[derive(Debug, Deserialize)]
struct BingxData {
    symbol: String,
    #[serde(default)]
    trades: Vec<BingxTrade>,
}

#[derive(Debug, Deserialize)]
struct BingxTrade {
    price: String,
}

/// [`PriceApiHandler`] for the BingX spot price API.
///
/// Atomic: the venue prices a single symbol per request.
#[derive(Debug)]
pub struct BingxApiHandler {
    api: ApiConfig,
}

impl BingxApiHandler {
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

impl PriceApiHandler for BingxApiHandler {
    fn create_url(&self, tickers: &[ProviderTicker]) -> Result<String, ProviderError> {
        let [ticker] = tickers else {
            return Err(ProviderError::new(
                ErrorCode::InvalidResponse,
                format!("expected 1 ticker, got {}", tickers.len()),
            ));
        };

        Ok(self
            .api
            .endpoints[0]
            .url
            .replacen("%s", ticker.off_chain_ticker(), 1))
    }

    fn parse_response(
        &self,
        tickers: &[ProviderTicker],
        _status: StatusCode,
        payload: &[u8],
    ) -> PriceResponse {
        let [ticker] = tickers else {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::InvalidResponse,
                    format!("expected 1 ticker, got {}", tickers.len()),
                ),
            );
        };

        let response: BingxResponse = match serde_json::from_slice(payload) {
            Ok(response) => response,
            Err(error) => {
                return PriceResponse::with_err(
                    tickers,
                    ProviderError::new(ErrorCode::FailedToDecode, error.to_string()),
                );
            }
        };

        if response.code != 0 {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::InvalidResponse,
                    format!("request returned error code {}", response.code),
                ),
            );
        }

        let Some(trade) = response
            .data
            .iter()
            .filter(|data| data.symbol == ticker.off_chain_ticker().as_str())
            .flat_map(|data| &data.trades)
            .last()
        else {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::FailedToParsePrice,
                    format!("no trades for symbol {}", ticker.off_chain_ticker()),
                ),
            );
        };

        match Decimal::from_str(&trade.price) {
            Err(error) => PriceResponse::with_err(
                tickers,
                ProviderError::new(ErrorCode::FailedToParsePrice, error.to_string()),
            ),
            Ok(price) => {
                let mut resolved = ResolvedPrices::default();
                resolved.insert(ticker.clone(), PriceResult::new(price, Utc::now()));
                PriceResponse::new(resolved, UnresolvedPrices::default())
            }
        }
    }
}
