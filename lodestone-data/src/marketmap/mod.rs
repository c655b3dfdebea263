use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use lodestone_market::MarketMap;
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// Market-map source reading a chain's on-chain market params over REST.
pub mod mainnet;

/// Fan-out/fan-in aggregator over the mainnet and research sources.
pub mod multi;

/// Conversion from an upstream's market-params schema to the canonical market map.
pub mod params;

/// Market-map source reading a published research document.
pub mod research;

/// Identifier of the chain a market map is fetched for.
///
/// Passed explicitly to every fetcher; there is no process-wide chain registration.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Chain {
    pub chain_id: SmolStr,
}

impl Chain {
    pub fn new<S>(chain_id: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self {
            chain_id: chain_id.into(),
        }
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.chain_id)
    }
}

/// Successfully fetched market map with its observation time.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResolvedMarketMap {
    pub value: MarketMap,
    pub time: DateTime<Utc>,
}

impl ResolvedMarketMap {
    pub fn new(value: MarketMap, time: DateTime<Utc>) -> Self {
        Self { value, time }
    }
}

/// Outcome of one market-map fetch: per chain, either a resolved map or a typed error.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MarketMapResponse {
    pub resolved: FnvHashMap<Chain, ResolvedMarketMap>,
    pub unresolved: FnvHashMap<Chain, ProviderError>,
}

impl MarketMapResponse {
    /// A response resolving a single chain.
    pub fn resolved(chain: Chain, value: MarketMap, time: DateTime<Utc>) -> Self {
        let mut resolved = FnvHashMap::default();
        resolved.insert(chain, ResolvedMarketMap::new(value, time));
        Self {
            resolved,
            unresolved: FnvHashMap::default(),
        }
    }

    /// Mark every provided chain unresolved with the same error.
    pub fn with_err(chains: &[Chain], error: ProviderError) -> Self {
        Self {
            resolved: FnvHashMap::default(),
            unresolved: chains
                .iter()
                .map(|chain| (chain.clone(), error.clone()))
                .collect(),
        }
    }
}

/// A source of authoritative market maps.
///
/// Cancellation is cooperative: dropping the future returned by [`Self::fetch`] abandons
/// any in-flight requests, and partial results are discarded with it.
#[async_trait]
pub trait MarketMapFetcher: Send + Sync {
    async fn fetch(&self, chains: &[Chain]) -> MarketMapResponse;
}
