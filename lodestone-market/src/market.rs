use crate::{error::MarketError, pair::CurrencyPair, ticker::Ticker};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Binding of one canonical ticker to a single venue.
///
/// `off_chain_ticker` is the symbol the venue uses on the wire (eg/ `"BTC-USDT"`,
/// `"XXBTZUSD"`). `metadata_json` is an opaque venue specific blob - empty for most
/// centralized exchanges, pool/vault descriptors for on-chain venues.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name: SmolStr,
    pub off_chain_ticker: SmolStr,
    #[serde(default)]
    pub invert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize_by_pair: Option<CurrencyPair>,
    #[serde(default)]
    pub metadata_json: String,
}

impl ProviderConfig {
    /// Check the venue name and off-chain symbol are non-empty and any metadata is
    /// well-formed JSON. Whether the venue name is *known* is decided by the provider
    /// manager against its registry, not here.
    pub fn validate(&self, ticker: &CurrencyPair) -> Result<(), MarketError> {
        if self.name.is_empty() {
            return Err(MarketError::InvalidProviderConfig {
                name: self.name.to_string(),
                ticker: ticker.to_string(),
                reason: "venue name is empty".to_string(),
            });
        }

        if self.off_chain_ticker.is_empty() {
            return Err(MarketError::InvalidProviderConfig {
                name: self.name.to_string(),
                ticker: ticker.to_string(),
                reason: "off-chain ticker is empty".to_string(),
            });
        }

        if let Some(pair) = &self.normalize_by_pair {
            pair.validate()?;
        }

        if !self.metadata_json.is_empty()
            && serde_json::from_str::<serde::de::IgnoredAny>(&self.metadata_json).is_err()
        {
            return Err(MarketError::InvalidProviderConfig {
                name: self.name.to_string(),
                ticker: ticker.to_string(),
                reason: "metadata is not valid JSON".to_string(),
            });
        }

        Ok(())
    }
}

/// Pairing of one [`Ticker`] with the venues that quote it.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Market {
    pub ticker: Ticker,
    pub provider_configs: Vec<ProviderConfig>,
}

impl Market {
    /// Check the ticker is valid, every provider config is valid, and enough venues are
    /// bound to satisfy the ticker's `min_provider_count`.
    pub fn validate(&self) -> Result<(), MarketError> {
        self.ticker.validate()?;

        for config in &self.provider_configs {
            config.validate(&self.ticker.pair)?;
        }

        if (self.provider_configs.len() as u64) < self.ticker.min_provider_count {
            return Err(MarketError::InvalidMarket {
                ticker: self.ticker.to_string(),
                reason: format!(
                    "{} provider configs cannot satisfy min provider count {}",
                    self.provider_configs.len(),
                    self.ticker.min_provider_count
                ),
            });
        }

        Ok(())
    }
}

/// Authoritative table mapping a canonical ticker string (`"BASE/QUOTE"`) to its
/// [`Market`].
///
/// A `BTreeMap` keeps iteration deterministic, which keeps provider views and
/// validation errors stable across refreshes.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct MarketMap {
    pub markets: BTreeMap<String, Market>,
}

impl MarketMap {
    /// Insert a [`Market`], keyed by its ticker's canonical string form.
    pub fn insert(&mut self, market: Market) {
        self.markets.insert(market.ticker.to_string(), market);
    }

    /// Return the [`Market`] for the provided canonical ticker string, if present.
    pub fn get(&self, ticker: &str) -> Option<&Market> {
        self.markets.get(ticker)
    }

    /// Check every market is valid, every key equals its ticker's canonical form, and no
    /// normalize-by pair references a ticker absent from the map.
    pub fn validate(&self) -> Result<(), MarketError> {
        for (key, market) in &self.markets {
            market.validate()?;

            let canonical = market.ticker.to_string();
            if *key != canonical {
                return Err(MarketError::KeyMismatch {
                    key: key.clone(),
                    ticker: canonical,
                });
            }

            for config in &market.provider_configs {
                if let Some(pair) = &config.normalize_by_pair {
                    if !self.markets.contains_key(&pair.to_string()) {
                        return Err(MarketError::OrphanedNormalizePair {
                            ticker: canonical,
                            pair: pair.to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(min_provider_count: u64, configs: Vec<ProviderConfig>) -> Market {
        Market {
            ticker: Ticker::new(CurrencyPair::new("BTC", "USD"), 8, min_provider_count, true),
            provider_configs: configs,
        }
    }

    fn provider_config(name: &str, off_chain: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.into(),
            off_chain_ticker: off_chain.into(),
            invert: false,
            normalize_by_pair: None,
            metadata_json: String::new(),
        }
    }

    #[test]
    fn test_market_validate_min_provider_count() {
        let valid = market(1, vec![provider_config("coinbase_ws", "BTC-USD")]);
        assert!(valid.validate().is_ok());

        let underfilled = market(2, vec![provider_config("coinbase_ws", "BTC-USD")]);
        assert!(underfilled.validate().is_err());

        let empty = market(1, vec![]);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_provider_config_validate_metadata_json() {
        let mut config = provider_config("raydium_api", "SOL/USD");
        let pair = CurrencyPair::new("SOL", "USD");

        assert!(config.validate(&pair).is_ok());

        config.metadata_json = r#"{"amm_info_address":"abc"}"#.to_string();
        assert!(config.validate(&pair).is_ok());

        config.metadata_json = "{not json".to_string();
        assert!(config.validate(&pair).is_err());
    }

    #[test]
    fn test_market_map_validate_key_mismatch() {
        let mut map = MarketMap::default();
        map.markets.insert(
            "ETH/USD".to_string(),
            market(1, vec![provider_config("coinbase_ws", "BTC-USD")]),
        );

        assert!(matches!(
            map.validate(),
            Err(MarketError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_market_map_validate_orphaned_normalize_pair() {
        let mut config = provider_config("okx_ws", "BTC-USDT");
        config.normalize_by_pair = Some(CurrencyPair::new("USDT", "USD"));

        let mut map = MarketMap::default();
        map.insert(market(1, vec![config]));

        assert!(matches!(
            map.validate(),
            Err(MarketError::OrphanedNormalizePair { .. })
        ));

        // Adding the referenced market repairs the map.
        let usdt = Market {
            ticker: Ticker::new(CurrencyPair::new("USDT", "USD"), 9, 1, true),
            provider_configs: vec![provider_config("coinbase_ws", "USDT-USD")],
        };
        let mut repaired = map.clone();
        repaired.insert(usdt);
        assert!(repaired.validate().is_ok());
    }
}
