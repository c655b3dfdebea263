use crate::{
    config::Endpoint,
    error::{DataError, ErrorCode, ProviderError},
    marketmap::{Chain, MarketMapFetcher, MarketMapResponse, params},
};
use async_trait::async_trait;
use chrono::Utc;
use lodestone_integration::protocol::rest::RestClient;
use std::time::Duration;
use tracing::debug;

/// Path appended to the chain REST endpoint to list every market param.
pub const MARKET_PARAMS_PATH: &str = "/oracle/params/markets?limit=10000";

/// Market-map source reading the chain's own market params.
///
/// The raw params are converted through [`params`] and the result revalidated before it
/// is published as resolved.
#[derive(Debug)]
pub struct MainnetMarketMapFetcher {
    client: RestClient,
    endpoint: Endpoint,
    chain: Chain,
}

impl MainnetMarketMapFetcher {
    pub fn new(endpoint: Endpoint, timeout: Duration, chain: Chain) -> Result<Self, DataError> {
        if endpoint.url.is_empty() {
            return Err(DataError::config("mainnet market map", "endpoint url is empty"));
        }

        Ok(Self {
            client: RestClient::new(timeout)?,
            endpoint,
            chain,
        })
    }
}

#[async_trait]
impl MarketMapFetcher for MainnetMarketMapFetcher {
    async fn fetch(&self, chains: &[Chain]) -> MarketMapResponse {
        let url = format!(
            "{}{MARKET_PARAMS_PATH}",
            self.endpoint.url.trim_end_matches('/')
        );

        let payload = match self.client.get(&url).await {
            Err(error) => {
                return MarketMapResponse::with_err(
                    chains,
                    ProviderError::new(ErrorCode::ApiGeneral, error.to_string()),
                );
            }
            Ok((status, _)) if !status.is_success() => {
                return MarketMapResponse::with_err(
                    chains,
                    ProviderError::new(
                        ErrorCode::InvalidResponse,
                        format!("status {status}"),
                    ),
                );
            }
            Ok((_, payload)) => payload,
        };

        let market_params: params::QueryAllMarketParamsResponse =
            match serde_json::from_slice(&payload) {
                Ok(market_params) => market_params,
                Err(error) => {
                    return MarketMapResponse::with_err(
                        chains,
                        ProviderError::new(ErrorCode::FailedToDecode, error.to_string()),
                    );
                }
            };

        let market_map = match params::convert_market_params_to_market_map(market_params) {
            Ok(market_map) => market_map,
            Err(error) => {
                return MarketMapResponse::with_err(
                    chains,
                    ProviderError::new(ErrorCode::InvalidResponse, error.to_string()),
                );
            }
        };

        if let Err(error) = market_map.validate() {
            return MarketMapResponse::with_err(
                chains,
                ProviderError::new(
                    ErrorCode::Unknown,
                    format!("converted market map failed validation: {error}"),
                ),
            );
        }

        debug!(chain = %self.chain, markets = market_map.markets.len(), "fetched market map from mainnet");
        MarketMapResponse::resolved(self.chain.clone(), market_map, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_failure_maps_to_api_general() {
        let fetcher = MainnetMarketMapFetcher::new(
            Endpoint::new("http://127.0.0.1:1"),
            Duration::from_millis(500),
            Chain::new("lodestone-1"),
        )
        .unwrap();

        let chains = [Chain::new("lodestone-1")];
        let response = fetcher.fetch(&chains).await;

        let error = response.unresolved.get(&chains[0]).unwrap();
        assert_eq!(error.code(), ErrorCode::ApiGeneral);
    }

    #[test]
    fn test_new_rejects_empty_endpoint() {
        assert!(
            MainnetMarketMapFetcher::new(
                Endpoint::new(""),
                Duration::from_secs(1),
                Chain::new("lodestone-1"),
            )
            .is_err()
        );
    }
}
