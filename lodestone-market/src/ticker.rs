use crate::{error::MarketError, pair::CurrencyPair};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Maximum decimal exponent a [`Ticker`] may declare.
pub const MAX_DECIMALS: u8 = 18;

/// Canonical ticker - a [`CurrencyPair`] plus the numeric policy downstream consumers
/// apply to its price.
///
/// `min_provider_count` is the number of independent venues that must be quoting the pair
/// before downstream consumers will trust an aggregate for it.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Ticker {
    pub pair: CurrencyPair,
    pub decimals: u8,
    pub min_provider_count: u64,
    #[serde(default)]
    pub enabled: bool,
}

impl Ticker {
    /// Construct a new [`Self`] from the provided pair and policy.
    pub fn new(pair: CurrencyPair, decimals: u8, min_provider_count: u64, enabled: bool) -> Self {
        Self {
            pair,
            decimals,
            min_provider_count,
            enabled,
        }
    }

    /// Check the pair is canonical, `decimals` is within `[0, MAX_DECIMALS]`, and at least
    /// one provider is required.
    pub fn validate(&self) -> Result<(), MarketError> {
        self.pair.validate()?;

        if self.decimals > MAX_DECIMALS {
            return Err(MarketError::InvalidTicker {
                ticker: self.to_string(),
                reason: format!("decimals {} exceeds maximum {MAX_DECIMALS}", self.decimals),
            });
        }

        if self.min_provider_count == 0 {
            return Err(MarketError::InvalidTicker {
                ticker: self.to_string(),
                reason: "min provider count must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.pair, f)
    }
}
