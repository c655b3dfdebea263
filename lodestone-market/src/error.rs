use thiserror::Error;

/// All market-map data model validation and parsing errors generated in `lodestone-market`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("invalid currency pair {pair}: {reason}")]
    InvalidPair { pair: String, reason: String },

    #[error("invalid ticker {ticker}: {reason}")]
    InvalidTicker { ticker: String, reason: String },

    #[error("invalid provider config {name} for {ticker}: {reason}")]
    InvalidProviderConfig {
        name: String,
        ticker: String,
        reason: String,
    },

    #[error("invalid market {ticker}: {reason}")]
    InvalidMarket { ticker: String, reason: String },

    #[error("market map key {key} does not match contained ticker {ticker}")]
    KeyMismatch { key: String, ticker: String },

    #[error("market {ticker} references normalize-by pair {pair} absent from the market map")]
    OrphanedNormalizePair { ticker: String, pair: String },
}
