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
const SUCCESS_CODE: i64 = 1000;

#[derive(Debug, Deserialize)]
struct BitmartResponse {
    code: i64,
    #[serde(default)]
    data: Option<BitmartData>,
}

#[derive(Debug, Deserialize)]
struct BitmartData {
    symbol: String,
    #[serde(rename = "last")]
    last_price: String,
}

/// [`PriceApiHandler`] for the Bitmart spot quotation API. Atomic.
#[derive(Debug)]
pub struct BitmartApiHandler {
    api: ApiConfig,
}

impl BitmartApiHandler {
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

impl PriceApiHandler for BitmartApiHandler {
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

        let response: BitmartResponse = match serde_json::from_slice(payload) {
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
                    format!("request returned error code {}", response.code),
                ),
            );
        }

        let Some(data) = response.data else {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(ErrorCode::InvalidResponse, "response carries no data"),
            );
        };

        if data.symbol != ticker.off_chain_ticker().as_str() {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::UnknownPair,
                    format!("response symbol {} does not match request", data.symbol),
                ),
            );
        }

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
    use crate::venues::bitmart::default_api_config;
    use rust_decimal_macros::dec;

    fn handler() -> BitmartApiHandler {
        BitmartApiHandler::new(default_api_config()).unwrap()
    }

    #[test]
    fn test_create_url() {
        let ticker = ProviderTicker::new("BTC/USD", "BTC_USDT", "");
        let url = handler().create_url(&[ticker]).unwrap();
        assert_eq!(
            url,
            "https://api-cloud.bitmart.com/spot/quotation/v3/ticker?symbol=BTC_USDT"
        );
    }

    #[test]
    fn test_parse_response() {
        let ticker = ProviderTicker::new("BTC/USD", "BTC_USDT", "");

        let ok = r#"{"code":1000,"data":{"symbol":"BTC_USDT","last":"42000.5"}}"#;
        let response = handler().parse_response(&[ticker.clone()], StatusCode::OK, ok.as_bytes());
        assert_eq!(
            response.resolved.get(&ticker).unwrap().price,
            dec!(42000.5)
        );

        let failed = r#"{"code":30000,"message":"symbol not found"}"#;
        let response =
            handler().parse_response(&[ticker.clone()], StatusCode::OK, failed.as_bytes());
        assert_eq!(
            response.unresolved.get(&ticker).unwrap().code(),
            ErrorCode::InvalidResponse
        );
    }
}
