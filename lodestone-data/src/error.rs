use derive_more::Display;
use lodestone_integration::error::SocketError;
use lodestone_market::error::MarketError;
use smol_str::SmolStr;
use thiserror::Error;

/// Typed error code attached to every unresolved result.
///
/// Downstream consumers branch on the code; the human-readable cause rides alongside it in
/// the owning [`ProviderError`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Display)]
pub enum ErrorCode {
    #[display("unknown_pair")]
    UnknownPair,
    #[display("failed_to_decode")]
    FailedToDecode,
    #[display("invalid_response")]
    InvalidResponse,
    #[display("failed_to_parse_price")]
    FailedToParsePrice,
    #[display("api_general")]
    ApiGeneral,
    #[display("unknown")]
    Unknown,
}

/// Runtime failure for a single ticker at a single tick/frame - an [`ErrorCode`] plus the
/// wrapped cause.
///
/// These are *captured* into unresolved results and never abort a provider loop.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("[{code}] {message}")]
pub struct ProviderError {
    code: ErrorCode,
    message: String,
}

impl ProviderError {
    /// Construct a new [`Self`] from the provided code and cause.
    pub fn new<S>(code: ErrorCode, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

/// Construction-time errors generated in `lodestone-data`.
///
/// Unlike [`ProviderError`], these propagate upward and abort startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid config for {name}: {reason}")]
    Config { name: SmolStr, reason: String },

    #[error("unknown venue: {0}")]
    UnknownVenue(SmolStr),

    #[error("venue {0} has no enabled transport")]
    NoTransport(SmolStr),

    #[error("market map error: {0}")]
    Market(#[from] MarketError),

    #[error("socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("failed to decode {context}: {error}")]
    Decode {
        context: &'static str,
        error: serde_json::Error,
    },

    #[error("invalid market params for {pair}: {reason}")]
    MarketParams { pair: String, reason: String },
}

impl DataError {
    /// Construct a config validation error for the named component.
    pub fn config<S>(name: &str, reason: S) -> Self
    where
        S: Into<String>,
    {
        Self::Config {
            name: SmolStr::new(name),
            reason: reason.into(),
        }
    }
}
