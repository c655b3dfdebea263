#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Lodestone-Market
//! Lodestone-Market contains the canonical market-map data structures shared by every
//! Lodestone component - [`CurrencyPair`](pair::CurrencyPair), [`Ticker`](ticker::Ticker),
//! [`Market`](market::Market) and [`MarketMap`](market::MarketMap) - plus the strict
//! parsing, formatting and validation rules that keep a market map internally consistent.
//!
//! A market map is the authoritative table `ticker -> (ticker policy, per-venue bindings)`
//! that drives provider enablement in `lodestone-data`.

/// All [`Error`](std::error::Error)s generated in Lodestone-Market.
pub mod error;

/// [`ProviderConfig`](market::ProviderConfig), [`Market`](market::Market) and
/// [`MarketMap`](market::MarketMap) definitions with `validate` implementations.
pub mod market;

/// Canonical slash-delimited [`CurrencyPair`](pair::CurrencyPair) and its strict
/// parse/format round-trip.
pub mod pair;

/// Canonical [`Ticker`](ticker::Ticker) - a [`CurrencyPair`](pair::CurrencyPair) plus its
/// numeric policy (decimals, minimum provider count, enabled flag).
pub mod ticker;

pub use error::MarketError;
pub use market::{Market, MarketMap, ProviderConfig};
pub use pair::CurrencyPair;
pub use ticker::Ticker;
