use crate::{
    config::{ApiConfig, ConfigKind, VenueConfig, WebSocketConfig},
    error::DataError,
    handler::{PriceApiHandler, PriceWsHandler},
};
use smol_str::SmolStr;

/// `BingX` price API handler.
pub mod bingx;

/// `Bitfinex` price WebSocket handler, including its channel-id confirmation map.
pub mod bitfinex;

/// `Bitget` price WebSocket handler.
pub mod bitget;

/// `Bitmart` price API & WebSocket handlers.
pub mod bitmart;

/// `Bitverse` price API & WebSocket handlers.
pub mod bitverse;

/// `CoinMarketCap` price API handler (non-atomic) and the static id catalogue used by the
/// CMC-only market-map projection.
pub mod coinmarketcap;

/// Metadata codecs for on-chain venues (UniswapV3, PancakeSwap, Raydium).
pub mod defi;

/// Deterministic offline test venue.
pub mod volatile;

/// `XT` price API & WebSocket handlers.
pub mod xt;

/// Construct the [`PriceApiHandler`] registered for the provided venue name.
pub fn api_handler(
    name: &str,
    config: &ApiConfig,
) -> Result<Box<dyn PriceApiHandler>, DataError> {
    match name {
        bingx::NAME => Ok(Box::new(bingx::BingxApiHandler::new(config.clone())?)),
        bitmart::API_NAME => Ok(Box::new(bitmart::BitmartApiHandler::new(config.clone())?)),
        bitverse::API_NAME => Ok(Box::new(bitverse::BitverseApiHandler::new(config.clone())?)),
        coinmarketcap::NAME => Ok(Box::new(coinmarketcap::CoinMarketCapApiHandler::new(
            config.clone(),
        )?)),
        volatile::NAME => Ok(Box::new(volatile::VolatileApiHandler::new(config.clone())?)),
        xt::API_NAME => Ok(Box::new(xt::XtApiHandler::new(config.clone())?)),
        _ => Err(DataError::UnknownVenue(SmolStr::new(name))),
    }
}

/// Construct the [`PriceWsHandler`] registered for the provided venue name.
pub fn ws_handler(
    name: &str,
    config: &WebSocketConfig,
) -> Result<Box<dyn PriceWsHandler>, DataError> {
    match name {
        bitfinex::NAME => Ok(Box::new(bitfinex::BitfinexWsHandler::new(config.clone())?)),
        bitget::NAME => Ok(Box::new(bitget::BitgetWsHandler::new(config.clone())?)),
        bitmart::WS_NAME => Ok(Box::new(bitmart::BitmartWsHandler::new(config.clone())?)),
        bitverse::WS_NAME => Ok(Box::new(bitverse::BitverseWsHandler::new(config.clone())?)),
        xt::WS_NAME => Ok(Box::new(xt::XtWsHandler::new(config.clone())?)),
        _ => Err(DataError::UnknownVenue(SmolStr::new(name))),
    }
}

/// Default configuration for every shipped venue, in the shape the provider manager
/// consumes.
pub fn default_providers() -> Vec<VenueConfig> {
    vec![
        // Exchange API providers
        VenueConfig::api(bingx::NAME, bingx::default_api_config(), ConfigKind::Price),
        VenueConfig::api(
            bitmart::API_NAME,
            bitmart::default_api_config(),
            ConfigKind::Price,
        ),
        VenueConfig::api(
            bitverse::API_NAME,
            bitverse::default_api_config(),
            ConfigKind::Price,
        ),
        VenueConfig::api(
            coinmarketcap::NAME,
            coinmarketcap::default_api_config(),
            ConfigKind::Price,
        ),
        VenueConfig::api(xt::API_NAME, xt::default_api_config(), ConfigKind::Price),
        // Exchange WebSocket providers
        VenueConfig::websocket(
            bitfinex::NAME,
            bitfinex::default_websocket_config(),
            ConfigKind::Price,
        ),
        VenueConfig::websocket(
            bitget::NAME,
            bitget::default_websocket_config(),
            ConfigKind::Price,
        ),
        VenueConfig::websocket(
            bitmart::WS_NAME,
            bitmart::default_websocket_config(),
            ConfigKind::Price,
        ),
        VenueConfig::websocket(
            bitverse::WS_NAME,
            bitverse::default_websocket_config(),
            ConfigKind::Price,
        ),
        VenueConfig::websocket(xt::WS_NAME, xt::default_websocket_config(), ConfigKind::Price),
    ]
}
