use super::API_NAME;
use crate::{
    config::ApiConfig,
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

/// Code the venue attaches to a successful response.
const SUCCESS_CODE: u32 = 200;

#[derive(Debug, Deserialize)]
struct BitverseResponse {
    code: u32,
    #[serde(default)]
    data: Option<BitverseTicker>,
}

/// Ticker payload of the market ticker endpoint. The venue quotes three prices; the last
/// traded price is the one fed downstream.
#[derive(Debug, Deserialize)]
struct BitverseTicker {
    #[serde(rename = "symbol")]
    _symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
}

/// [`PriceApiHandler`] for the Bitverse market ticker API. Atomic.
#[derive(Debug)]
pub struct BitverseApiHandler {
    api: ApiConfig,
}

impl BitverseApiHandler {
    pub fn new(api: ApiConfig) -> Result<Self, DataError> {
        if api.name != API_NAME {
            return Err(DataError::config(
                API_NAME,
                format!("expected api config name {API_NAME}, got {}", api.name),
            ));
        }
        if !api.enabled {
            return Err(DataError::config(API_NAME, "api config is not enabled"));
        }
        api.validate()?;

        Ok(Self { api })
    }
}

impl PriceApiHandler for BitverseApiHandler {
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

        let response: BitverseResponse = match serde_json::from_slice(payload) {
            Ok(response) => response,
            Err(error) => {
                return PriceResponse::with_err(
                    tickers,
                    ProviderError::new(ErrorCode::FailedToDecode, error.to_string()),
                );
            }
        };

        if response.code != SUCCESS_CODE {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::InvalidResponse,
                    format!("api call failed, code: {}", response.code),
                ),
            );
        }

        let Some(data) = response.data else {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(ErrorCode::InvalidResponse, "response carries no data"),
            );
        };

        match Decimal::from_str(&data.last_price) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::bitverse::default_api_config;
    use rust_decimal_macros::dec;

    fn handler() -> BitverseApiHandler {
        BitverseApiHandler::new(default_api_config()).unwrap()
    }

    #[test]
    fn test_parse_response() {
        let ticker = ProviderTicker::new("BTC/USD", "BTC-USD", "");

        let ok = r#"{"code":200,"data":{"symbol":"BTC-USD","indexPrice":"42001","oraclePrice":"42002","lastPrice":"42000.5"}}"#;
        let response = handler().parse_response(&[ticker.clone()], StatusCode::OK, ok.as_bytes());
        assert_eq!(response.len(), 1);
        assert_eq!(
            response.resolved.get(&ticker).unwrap().price,
            dec!(42000.5)
        );

        let failed = r#"{"code":500}"#;
        let response =
            handler().parse_response(&[ticker.clone()], StatusCode::OK, failed.as_bytes());
        assert_eq!(
            response.unresolved.get(&ticker).unwrap().code(),
            ErrorCode::InvalidResponse
        );
    }
}
