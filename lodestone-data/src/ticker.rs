use fnv::FnvHashMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// A venue's view of one canonical ticker: the canonical `"BASE/QUOTE"` string, the symbol
/// the venue uses on the wire, and any venue specific metadata carried over from the
/// market map.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProviderTicker {
    ticker: SmolStr,
    off_chain_ticker: SmolStr,
    metadata_json: String,
}

impl ProviderTicker {
    /// Construct a new [`Self`] from the canonical ticker string and the venue's off-chain
    /// symbol.
    pub fn new<S, M>(ticker: S, off_chain_ticker: S, metadata_json: M) -> Self
    where
        S: Into<SmolStr>,
        M: Into<String>,
    {
        Self {
            ticker: ticker.into(),
            off_chain_ticker: off_chain_ticker.into(),
            metadata_json: metadata_json.into(),
        }
    }

    /// Canonical `"BASE/QUOTE"` string.
    pub fn ticker(&self) -> &SmolStr {
        &self.ticker
    }

    /// Venue specific wire symbol (eg/ `"BTC-USDT"`).
    pub fn off_chain_ticker(&self) -> &SmolStr {
        &self.off_chain_ticker
    }

    /// Opaque venue metadata JSON; empty for most centralized exchanges.
    pub fn metadata_json(&self) -> &str {
        &self.metadata_json
    }
}

impl Display for ProviderTicker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ticker)
    }
}

/// Bidirectional map between canonical tickers and a venue's off-chain symbols.
///
/// Safe for concurrent reads during an add (single-writer / many-reader). There is no
/// removal: when a provider's ticker set changes the cache is rebuilt, not edited.
#[derive(Debug, Default)]
pub struct ProviderTickerCache {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_ticker: FnvHashMap<SmolStr, ProviderTicker>,
    by_off_chain: FnvHashMap<SmolStr, ProviderTicker>,
}

impl ProviderTickerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ticker to both sides of the map. Duplicate adds are idempotent.
    pub fn add(&self, ticker: ProviderTicker) {
        let mut inner = self.inner.write();
        inner
            .by_ticker
            .insert(ticker.ticker.clone(), ticker.clone());
        inner
            .by_off_chain
            .insert(ticker.off_chain_ticker.clone(), ticker);
    }

    /// Look up the ticker a venue symbol maps to.
    pub fn from_off_chain_ticker(&self, off_chain_ticker: &str) -> Option<ProviderTicker> {
        self.inner.read().by_off_chain.get(off_chain_ticker).cloned()
    }

    /// Point-in-time copy of every cached ticker.
    pub fn snapshot(&self) -> Vec<ProviderTicker> {
        self.inner.read().by_ticker.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_maps_are_inverses() {
        let tickers = vec![
            ProviderTicker::new("BTC/USD", "BTC-USDT", ""),
            ProviderTicker::new("ETH/USD", "ETH-USDT", ""),
            ProviderTicker::new("SOL/USD", "SOLUSDT", ""),
        ];
        let cache = ProviderTickerCache::new();
        for ticker in &tickers {
            cache.add(ticker.clone());
        }

        for ticker in &tickers {
            let found = cache
                .from_off_chain_ticker(ticker.off_chain_ticker())
                .expect("off-chain symbol must resolve");
            assert_eq!(&found, ticker);
        }

        assert!(cache.from_off_chain_ticker("DOGE-USDT").is_none());
    }

    #[test]
    fn test_cache_add_is_idempotent() {
        let cache = ProviderTickerCache::new();
        let ticker = ProviderTicker::new("BTC/USD", "BTC-USDT", "");

        cache.add(ticker.clone());
        cache.add(ticker.clone());

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0], ticker);
    }
}
