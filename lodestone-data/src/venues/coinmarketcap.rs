use crate::{
    config::{ApiConfig, Endpoint},
    error::{DataError, ErrorCode, ProviderError},
    handler::PriceApiHandler,
    response::{PriceResponse, PriceResult, ResolvedPrices, UnresolvedPrices},
    ticker::ProviderTicker,
};
use chrono::Utc;
use lodestone_market::ProviderConfig;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Name of the CoinMarketCap price provider.
pub const NAME: &str = "coinmarketcap_api";

/// Quotes endpoint template. A comma-joined list of CMC numeric ids is substituted
/// for `%s` - CMC off-chain tickers are ids, not symbols.
pub const URL: &str =
    "https://pro-api.coinmarketcap.com/v2/cryptocurrency/quotes/latest?id=%s";

/// Default configuration for the CoinMarketCap API.
pub fn default_api_config() -> ApiConfig {
    ApiConfig {
        name: NAME.into(),
        enabled: true,
        atomic: false,
        timeout_ms: 5_000,
        interval_ms: 10_000,
        reconnect_timeout_ms: 2_000,
        max_queries: 20,
        endpoints: vec![Endpoint::new(URL)],
    }
}

#[derive(Debug, Deserialize)]
struct CmcResponse {
    #[serde(default)]
    status: Option<CmcStatus>,
    #[serde(default)]
    data: HashMap<String, CmcEntry>,
}

#[derive(Debug, Deserialize)]
struct CmcStatus {
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CmcEntry {
    quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    price: f64,
}

/// [`PriceApiHandler`] for the CoinMarketCap quotes API.
///
/// Non-atomic: up to `max_queries` ids are priced per request, and every requested ticker
/// lands in exactly one of the response maps.
#[derive(Debug)]
pub struct CoinMarketCapApiHandler {
    api: ApiConfig,
}

impl CoinMarketCapApiHandler {
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

impl PriceApiHandler for CoinMarketCapApiHandler {
    fn create_url(&self, tickers: &[ProviderTicker]) -> Result<String, ProviderError> {
        if tickers.is_empty() {
            return Err(ProviderError::new(
                ErrorCode::InvalidResponse,
                "expected at least 1 ticker",
            ));
        }
        if tickers.len() > self.api.max_queries {
            return Err(ProviderError::new(
                ErrorCode::InvalidResponse,
                format!(
                    "expected at most {} tickers, got {}",
                    self.api.max_queries,
                    tickers.len()
                ),
            ));
        }

        let ids = tickers
            .iter()
            .map(|ticker| ticker.off_chain_ticker().as_str())
            .collect::<Vec<_>>()
            .join(",");

        Ok(self.api.endpoints[0].url.replacen("%s", &ids, 1))
    }

    fn parse_response(
        &self,
        tickers: &[ProviderTicker],
        _status: StatusCode,
        payload: &[u8],
    ) -> PriceResponse {
        let response: CmcResponse = match serde_json::from_slice(payload) {
            Ok(response) => response,
            Err(error) => {
                return PriceResponse::with_err(
                    tickers,
                    ProviderError::new(ErrorCode::FailedToDecode, error.to_string()),
                );
            }
        };

        if let Some(status) = &response.status {
            if status.error_code != 0 {
                return PriceResponse::with_err(
                    tickers,
                    ProviderError::new(
                        ErrorCode::InvalidResponse,
                        format!(
                            "request returned error code {}: {}",
                            status.error_code,
                            status.error_message.as_deref().unwrap_or("")
                        ),
                    ),
                );
            }
        }

        let time = Utc::now();
        let mut resolved = ResolvedPrices::default();
        let mut unresolved = UnresolvedPrices::default();

        for ticker in tickers {
            let Some(entry) = response.data.get(ticker.off_chain_ticker().as_str()) else {
                unresolved.insert(
                    ticker.clone(),
                    ProviderError::new(
                        ErrorCode::UnknownPair,
                        format!("id {} missing from response", ticker.off_chain_ticker()),
                    ),
                );
                continue;
            };

            let Some(quote) = entry.quote.get("USD") else {
                unresolved.insert(
                    ticker.clone(),
                    ProviderError::new(ErrorCode::InvalidResponse, "no USD quote"),
                );
                continue;
            };

            match Decimal::try_from(quote.price) {
                Ok(price) => {
                    resolved.insert(ticker.clone(), PriceResult::new(price, time));
                }
                Err(error) => {
                    unresolved.insert(
                        ticker.clone(),
                        ProviderError::new(ErrorCode::FailedToParsePrice, error.to_string()),
                    );
                }
            }
        }

        PriceResponse::new(resolved, unresolved)
    }
}

/// Static catalogue of well-known CoinMarketCap ids.
///
/// The CMC-only market-map projection falls back to this when a market carries no CMC
/// binding of its own; tickers absent here as well are dropped from the projected map.
pub fn static_provider_config(ticker: &str) -> Option<ProviderConfig> {
    let id = match ticker {
        "BTC/USD" => "1",
        "ETH/USD" => "1027",
        "USDT/USD" => "825",
        "USDC/USD" => "3408",
        "SOL/USD" => "5426",
        "XRP/USD" => "52",
        "ADA/USD" => "2010",
        "AVAX/USD" => "5805",
        "DOGE/USD" => "74",
        "DOT/USD" => "6636",
        "LINK/USD" => "1975",
        "LTC/USD" => "2",
        "BCH/USD" => "1831",
        "ATOM/USD" => "3794",
        "UNI/USD" => "7083",
        _ => return None,
    };

    Some(ProviderConfig {
        name: NAME.into(),
        off_chain_ticker: id.into(),
        invert: false,
        normalize_by_pair: None,
        metadata_json: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn handler() -> CoinMarketCapApiHandler {
        CoinMarketCapApiHandler::new(default_api_config()).unwrap()
    }

    fn tickers() -> Vec<ProviderTicker> {
        vec![
            ProviderTicker::new("BTC/USD", "1", ""),
            ProviderTicker::new("ETH/USD", "1027", ""),
        ]
    }

    #[test]
    fn test_create_url_joins_ids() {
        let url = handler().create_url(&tickers()).unwrap();
        assert_eq!(
            url,
            "https://pro-api.coinmarketcap.com/v2/cryptocurrency/quotes/latest?id=1,1027"
        );

        assert!(handler().create_url(&[]).is_err());
    }

    #[test]
    fn test_parse_response_covers_every_input_ticker() {
        let payload = r#"{
            "status": {"error_code": 0},
            "data": {
                "1": {"quote": {"USD": {"price": 42000.5}}}
            }
        }"#;

        let tickers = tickers();
        let response = handler().parse_response(&tickers, StatusCode::OK, payload.as_bytes());

        // Non-atomic invariant: |resolved| + |unresolved| = |T|.
        assert_eq!(response.len(), tickers.len());
        assert_eq!(
            response.resolved.get(&tickers[0]).unwrap().price,
            dec!(42000.5)
        );
        assert_eq!(
            response.unresolved.get(&tickers[1]).unwrap().code(),
            ErrorCode::UnknownPair
        );
    }

    #[test]
    fn test_parse_response_venue_error() {
        let payload = r#"{"status": {"error_code": 1010, "error_message": "rate limited"}, "data": {}}"#;
        let tickers = tickers();
        let response = handler().parse_response(&tickers, StatusCode::OK, payload.as_bytes());

        assert_eq!(response.unresolved.len(), 2);
        for error in response.unresolved.values() {
            assert_eq!(error.code(), ErrorCode::InvalidResponse);
        }
    }

    #[test]
    fn test_static_catalogue() {
        let config = static_provider_config("BTC/USD").unwrap();
        assert_eq!(config.name, NAME);
        assert_eq!(config.off_chain_ticker, "1");

        assert!(static_provider_config("FOO/USD").is_none());
    }
}
