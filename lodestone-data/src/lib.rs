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

//! # Lodestone-Data
//! The concurrent provider runtime and market-map aggregation core of the Lodestone price
//! oracle - batteries included. It is:
//! * **Uniform**: request/response API venues and persistent WebSocket venues run under
//!   one scheduling harness, each owning a latest-results table read by snapshot.
//! * **Resilient**: per-tick and per-frame failures are captured as typed unresolved
//!   results and never abort a provider loop; reconnection and hot ticker-set swaps are
//!   built in.
//! * **Extensible**: a venue is a [`PriceApiHandler`](handler::PriceApiHandler) or
//!   [`PriceWsHandler`](handler::PriceWsHandler) implementation plus a registry entry -
//!   the runtime never learns venue wire formats.
//!
//! ## User API
//! - [`ProviderManager`](manager::ProviderManager) instantiates providers from an
//!   [`OracleConfig`](config::OracleConfig) and reconciles them against the current
//!   [`MarketMap`](lodestone_market::MarketMap).
//! - [`PriceProvider::get_data`](provider::PriceProvider::get_data) and
//!   [`ProviderManager::latest_prices`](manager::ProviderManager::latest_prices) expose
//!   resolved and unresolved quotes to downstream consumers.
//! - [`MultiMarketMapFetcher`](marketmap::multi::MultiMarketMapFetcher) aggregates the
//!   mainnet and research market-map sources, and
//!   [`ProviderManager::update_market_map`](manager::ProviderManager::update_market_map)
//!   applies the refreshed map.

/// Provider runtime configuration: per-venue API/WebSocket settings and defaults.
pub mod config;

/// WebSocket connector driving a [`PriceWsHandler`](handler::PriceWsHandler) across one
/// or more persistent connections.
pub mod connector;

/// Typed error codes, runtime [`ProviderError`](error::ProviderError)s and
/// construction-time [`DataError`](error::DataError)s.
pub mod error;

/// REST fetcher driving a [`PriceApiHandler`](handler::PriceApiHandler) on a fixed-rate
/// tick loop.
pub mod fetcher;

/// Data-handler contracts implemented once per venue.
pub mod handler;

/// [`ProviderManager`](manager::ProviderManager) - instantiates providers and reconciles
/// enablement against the market map.
pub mod manager;

/// Market-map fetchers: mainnet & research sources, the multi-source aggregator, and the
/// market-params converter.
pub mod marketmap;

/// Generic [`PriceProvider`](provider::PriceProvider) wrapping either connector family.
pub mod provider;

/// Resolved/unresolved price results and the per-provider result table.
pub mod response;

/// [`ProviderTicker`](ticker::ProviderTicker) and the bidirectional ticker cache.
pub mod ticker;

/// Per-venue handler implementations and the venue registry.
pub mod venues;

pub use error::{DataError, ErrorCode, ProviderError};
pub use manager::ProviderManager;
pub use provider::PriceProvider;
