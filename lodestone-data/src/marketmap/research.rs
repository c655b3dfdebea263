use crate::{
    config::Endpoint,
    error::{DataError, ErrorCode, ProviderError},
    marketmap::{Chain, MarketMapFetcher, MarketMapResponse},
};
use async_trait::async_trait;
use chrono::Utc;
use lodestone_integration::protocol::rest::RestClient;
use lodestone_market::MarketMap;
use std::time::Duration;
use tracing::debug;

/// Market-map source reading a published research document.
///
/// The document is the serialized [`MarketMap`] itself - markets proposed for listing
/// that the chain does not yet declare. The multi-source fetcher merges them in behind
/// mainnet's entries.
#[derive(Debug)]
pub struct ResearchMarketMapFetcher {
    client: RestClient,
    endpoint: Endpoint,
    chain: Chain,
}

impl ResearchMarketMapFetcher {
    pub fn new(endpoint: Endpoint, timeout: Duration, chain: Chain) -> Result<Self, DataError> {
        if endpoint.url.is_empty() {
            return Err(DataError::config(
                "research market map",
                "endpoint url is empty",
            ));
        }

        Ok(Self {
            client: RestClient::new(timeout)?,
            endpoint,
            chain,
        })
    }
}

#[async_trait]
impl MarketMapFetcher for ResearchMarketMapFetcher {
    async fn fetch(&self, chains: &[Chain]) -> MarketMapResponse {
        let payload = match self.client.get(&self.endpoint.url).await {
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

        let market_map: MarketMap = match serde_json::from_slice(&payload) {
            Ok(market_map) => market_map,
            Err(error) => {
                return MarketMapResponse::with_err(
                    chains,
                    ProviderError::new(ErrorCode::FailedToDecode, error.to_string()),
                );
            }
        };

        if let Err(error) = market_map.validate() {
            return MarketMapResponse::with_err(
                chains,
                ProviderError::new(
                    ErrorCode::Unknown,
                    format!("research market map failed validation: {error}"),
                ),
            );
        }

        debug!(chain = %self.chain, markets = market_map.markets.len(), "fetched research market map");
        MarketMapResponse::resolved(self.chain.clone(), market_map, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_failure_maps_to_api_general() {
        let fetcher = ResearchMarketMapFetcher::new(
            Endpoint::new("http://127.0.0.1:1/research.json"),
            Duration::from_millis(500),
            Chain::new("lodestone-1"),
        )
        .unwrap();

        let chains = [Chain::new("lodestone-1")];
        let response = fetcher.fetch(&chains).await;

        let error = response.unresolved.get(&chains[0]).unwrap();
        assert_eq!(error.code(), ErrorCode::ApiGeneral);
    }
}
