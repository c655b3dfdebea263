use crate::{error::ProviderError, ticker::ProviderTicker};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Successfully observed price for one ticker at one instant.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PriceResult {
    pub price: Decimal,
    pub time: DateTime<Utc>,
}

impl PriceResult {
    pub fn new(price: Decimal, time: DateTime<Utc>) -> Self {
        Self { price, time }
    }
}

/// Prices successfully extracted from one venue response or frame.
pub type ResolvedPrices = FnvHashMap<ProviderTicker, PriceResult>;

/// Tickers a venue response or frame failed to price, each with its typed cause.
pub type UnresolvedPrices = FnvHashMap<ProviderTicker, ProviderError>;

/// Outcome of one parsed venue response or WebSocket frame.
///
/// Every ticker handed to a data handler lands in exactly one of the two maps.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PriceResponse {
    pub resolved: ResolvedPrices,
    pub unresolved: UnresolvedPrices,
}

impl PriceResponse {
    pub fn new(resolved: ResolvedPrices, unresolved: UnresolvedPrices) -> Self {
        Self {
            resolved,
            unresolved,
        }
    }

    /// Mark every provided ticker unresolved with the same error.
    pub fn with_err<'a, I>(tickers: I, error: ProviderError) -> Self
    where
        I: IntoIterator<Item = &'a ProviderTicker>,
    {
        Self {
            resolved: ResolvedPrices::default(),
            unresolved: tickers
                .into_iter()
                .map(|ticker| (ticker.clone(), error.clone()))
                .collect(),
        }
    }

    /// Total number of tickers covered by this response.
    pub fn len(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.unresolved.is_empty()
    }
}

/// Latest observation for one ticker in a provider's result table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TickerResult {
    Resolved(PriceResult),
    Unresolved(ProviderError),
}

/// Per-provider table of latest observations, keyed by canonical ticker string.
///
/// Mutated only by the owning provider's single merger task; read by deep-copy snapshot.
pub type ResultTable = FnvHashMap<SmolStr, TickerResult>;
