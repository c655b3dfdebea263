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

#[derive(Debug, Deserialize)]
struct XtResponse {
    rc: i64,
    #[serde(default)]
    result: Vec<XtData>,
}

#[derive(Debug, Deserialize)]
struct XtData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
}

/// [`PriceApiHandler`] for the XT spot ticker API. Atomic.
#[derive(Debug)]
pub struct XtApiHandler {
    api: ApiConfig,
}

impl XtApiHandler {
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

impl PriceApiHandler for XtApiHandler {
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

        let response: XtResponse = match serde_json::from_slice(payload) {
            Ok(response) => response,
            Err(error) => {
                return PriceResponse::with_err(
                    tickers,
                    ProviderError::new(ErrorCode::FailedToDecode, error.to_string()),
                );
            }
        };

        if response.rc != 0 {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::InvalidResponse,
                    format!("request returned error code {}", response.rc),
                ),
            );
        }

        // The endpoint answers symbol queries with a one-element result list.
        let Some(data) = response
            .result
            .iter()
            .find(|data| data.symbol.eq_ignore_ascii_case(ticker.off_chain_ticker()))
        else {
            return PriceResponse::with_err(
                tickers,
                ProviderError::new(
                    ErrorCode::UnknownPair,
                    format!("symbol {} missing from response", ticker.off_chain_ticker()),
                ),
            );
        };

        match Decimal::from_str(&data.price) {
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
    use crate::venues::xt::default_api_config;
    use rust_decimal_macros::dec;

    fn handler() -> XtApiHandler {
        XtApiHandler::new(default_api_config()).unwrap()
    }

    #[test]
    fn test_parse_response() {
        let ticker = ProviderTicker::new("BTC/USD", "btc_usdt", "");

        let ok = r#"{"rc":0,"result":[{"s":"btc_usdt","p":"42000.5"}]}"#;
        let response = handler().parse_response(&[ticker.clone()], StatusCode::OK, ok.as_bytes());
        assert_eq!(
            response.resolved.get(&ticker).unwrap().price,
            dec!(42000.5)
        );

        let failed = r#"{"rc":1,"result":[]}"#;
        let response =
            handler().parse_response(&[ticker.clone()], StatusCode::OK, failed.as_bytes());
        assert_eq!(
            response.unresolved.get(&ticker).unwrap().code(),
            ErrorCode::InvalidResponse
        );
    }
}
