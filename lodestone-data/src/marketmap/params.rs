use crate::{
    error::DataError,
    venues::{bingx, bitfinex, bitmart, bitverse, coinmarketcap, defi, volatile, xt},
};
use lodestone_market::{CurrencyPair, Market, MarketMap, ProviderConfig, Ticker};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::HashSet;

/// Delimiter used by market params between the base and quote symbols (`"BTC-USD"`).
pub const PAIR_DELIMITER: char = '-';

/// Number of fields in a UniswapV3/PancakeSwap ticker
/// (`POOL_ADDRESS-BASE_DECIMALS-QUOTE_DECIMALS`).
pub const POOL_TICKER_FIELDS: usize = 3;

/// Minimum number of fields in a Raydium ticker
/// (`BASE-QUOTE-BASE_VAULT-BASE_DECIMALS-QUOTE_VAULT-QUOTE_DECIMALS-OPEN_ORDERS-AMM_ID`).
pub const RAYDIUM_TICKER_FIELDS: usize = 8;

// Venue names recognised by market params but shipped without a handler in this crate.
// They still flow into converted market maps for embedders registering their own
// connectors.
pub const BINANCE_WS: &str = "binance_ws";
pub const BITSTAMP_API: &str = "bitstamp_api";
pub const BYBIT_WS: &str = "bybit_ws";
pub const COINBASE_WS: &str = "coinbase_ws";
pub const CRYPTODOTCOM_WS: &str = "cryptodotcom_ws";
pub const GATE_WS: &str = "gate_ws";
pub const HUOBI_WS: &str = "huobi_ws";
pub const KRAKEN_API: &str = "kraken_api";
pub const KUCOIN_WS: &str = "kucoin_ws";
pub const MEXC_WS: &str = "mexc_ws";
pub const OKX_WS: &str = "okx_ws";

/// Listing of every market param declared by the chain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryAllMarketParamsResponse {
    #[serde(default)]
    pub market_params: Vec<MarketParam>,
}

/// One market as declared on chain.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketParam {
    /// Dash-delimited pair, eg/ `"BTC-USD"`.
    pub pair: String,
    /// Negative power of ten scaling quoted prices.
    pub exponent: i32,
    pub min_exchanges: u64,
    /// Embedded JSON listing the exchanges quoting this market.
    pub exchange_config_json: String,
}

/// Wire format of [`MarketParam::exchange_config_json`].
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
pub struct ExchangeConfigJson {
    #[serde(default)]
    pub exchanges: Vec<ExchangeMarketConfigJson>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeMarketConfigJson {
    pub exchange_name: String,
    pub ticker: String,
    #[serde(default)]
    pub adjust_by_market: Option<String>,
    #[serde(default)]
    pub invert: bool,
}

/// Convert a market-params listing to the canonical market map.
///
/// Any parse or validation error aborts the conversion for the whole listing and
/// propagates up.
pub fn convert_market_params_to_market_map(
    params: QueryAllMarketParamsResponse,
) -> Result<MarketMap, DataError> {
    let mut market_map = MarketMap::default();

    for market_param in params.market_params {
        let ticker = create_ticker_from_market(&market_param)?;

        let config: ExchangeConfigJson = serde_json::from_str(&market_param.exchange_config_json)
            .map_err(|error| DataError::Decode {
                context: "exchange config json",
                error,
            })?;

        let provider_configs = convert_exchange_config_json(&config)?;

        market_map.insert(Market {
            ticker,
            provider_configs,
        });
    }

    Ok(market_map)
}

/// Build a [`Ticker`] from one market param. The exponent must be negative; its magnitude
/// becomes the decimal count.
pub fn create_ticker_from_market(market: &MarketParam) -> Result<Ticker, DataError> {
    let pair = create_currency_pair_from_pair(&market.pair)?;

    if market.exponent >= 0 {
        return Err(DataError::MarketParams {
            pair: market.pair.clone(),
            reason: format!("exponent {} must be negative", market.exponent),
        });
    }

    let decimals =
        u8::try_from(-i64::from(market.exponent)).map_err(|_| DataError::MarketParams {
            pair: market.pair.clone(),
            reason: format!("exponent {} out of range", market.exponent),
        })?;

    let ticker = Ticker::new(pair, decimals, market.min_exchanges, true);
    ticker.validate()?;

    Ok(ticker)
}

/// Parse a dash-delimited pair (`"BTC-USD"`), uppercasing both halves.
pub fn create_currency_pair_from_pair(pair: &str) -> Result<CurrencyPair, DataError> {
    let parts: Vec<&str> = pair.split(PAIR_DELIMITER).collect();
    if parts.len() != 2 {
        return Err(DataError::MarketParams {
            pair: pair.to_string(),
            reason: format!("expected 2 elements, got {}", parts.len()),
        });
    }

    let pair = CurrencyPair::new(parts[0], parts[1]);
    pair.validate()?;

    Ok(pair)
}

/// Convert one exchange-config listing to provider configs.
///
/// Duplicate entries are deduplicated by full-tuple identity; exchanges outside the
/// static provider mapping are silently skipped.
pub fn convert_exchange_config_json(
    config: &ExchangeConfigJson,
) -> Result<Vec<ProviderConfig>, DataError> {
    let mut providers = Vec::with_capacity(config.exchanges.len());
    let mut seen: HashSet<&ExchangeMarketConfigJson> = HashSet::new();

    for entry in &config.exchanges {
        if !seen.insert(entry) {
            continue;
        }

        let Some(venue) = provider_name(&entry.exchange_name) else {
            continue;
        };

        let normalize_by_pair = entry
            .adjust_by_market
            .as_deref()
            .filter(|market| !market.is_empty())
            .map(create_currency_pair_from_pair)
            .transpose()?;

        let off_chain_ticker = convert_denom(venue, &entry.ticker)?;
        let metadata_json = extract_metadata(venue, entry)?;

        providers.push(ProviderConfig {
            name: venue.into(),
            off_chain_ticker,
            invert: entry.invert,
            normalize_by_pair,
            metadata_json,
        });
    }

    Ok(providers)
}

/// Map an exchange name as spelled in market params to the venue name used in market
/// maps.
pub fn provider_name(exchange: &str) -> Option<&'static str> {
    match exchange {
        "Binance" | "BinanceUS" => Some(BINANCE_WS),
        "Bingx" => Some(bingx::NAME),
        "Bitfinex" => Some(bitfinex::NAME),
        "Bitmart" => Some(bitmart::WS_NAME),
        "Bitstamp" => Some(BITSTAMP_API),
        "Bitverse" => Some(bitverse::WS_NAME),
        "Bybit" => Some(BYBIT_WS),
        "CoinbasePro" => Some(COINBASE_WS),
        "CoinMarketCap" | "coinmarketcap_api" => Some(coinmarketcap::NAME),
        "CryptoCom" => Some(CRYPTODOTCOM_WS),
        "Gate" => Some(GATE_WS),
        "Huobi" => Some(HUOBI_WS),
        // Only the API is supported since the WebSocket quotes different pairs.
        "Kraken" => Some(KRAKEN_API),
        "Kucoin" => Some(KUCOIN_WS),
        "Mexc" => Some(MEXC_WS),
        "Okx" => Some(OKX_WS),
        "PancakeSwap" => Some(defi::PANCAKESWAP_NAME),
        "Raydium" => Some(defi::RAYDIUM_NAME),
        "TestVolatileExchange" => Some(volatile::NAME),
        "UniswapV3-Base" => Some(defi::UNISWAPV3_BASE_CHAIN_NAME),
        "UniswapV3-Ethereum" => Some(defi::UNISWAPV3_ETHEREUM_NAME),
        "Xt" => Some(xt::WS_NAME),
        _ => None,
    }
}

/// Restate an off-chain ticker in the form the mapped venue expects.
pub fn convert_denom(venue: &str, denom: &str) -> Result<SmolStr, DataError> {
    match venue {
        // MEXC symbols drop the underscore: BTC_USDT -> BTCUSDT.
        MEXC_WS => Ok(SmolStr::new(denom.replace('_', ""))),
        // Raydium tickers embed vault metadata; the symbol is the leading pair.
        defi::RAYDIUM_NAME => {
            let fields: Vec<&str> = denom.split(PAIR_DELIMITER).collect();
            if fields.len() < 2 {
                return Err(DataError::MarketParams {
                    pair: denom.to_string(),
                    reason: format!("expected at least 2 fields, got {}", fields.len()),
                });
            }
            Ok(SmolStr::new(
                CurrencyPair::new(fields[0], fields[1]).to_string(),
            ))
        }
        _ => Ok(SmolStr::new(denom)),
    }
}

/// Extract venue metadata from an exchange entry. Most venues carry none.
pub fn extract_metadata(
    venue: &str,
    entry: &ExchangeMarketConfigJson,
) -> Result<String, DataError> {
    if venue.starts_with(defi::UNISWAPV3_BASE_NAME) {
        return pool_metadata_from_ticker(&entry.ticker, entry.invert);
    }

    match venue {
        defi::PANCAKESWAP_NAME => pool_metadata_from_ticker(&entry.ticker, entry.invert),
        defi::RAYDIUM_NAME => raydium_metadata_from_ticker(&entry.ticker),
        _ => Ok(String::new()),
    }
}

/// Decode `POOL_ADDRESS-BASE_DECIMALS-QUOTE_DECIMALS` into pool metadata JSON, as used by
/// UniswapV3 and PancakeSwap markets.
pub fn pool_metadata_from_ticker(ticker: &str, invert: bool) -> Result<String, DataError> {
    let fields: Vec<&str> = ticker.split(PAIR_DELIMITER).collect();
    if fields.len() != POOL_TICKER_FIELDS {
        return Err(DataError::MarketParams {
            pair: ticker.to_string(),
            reason: format!(
                "expected {POOL_TICKER_FIELDS} fields, got {}",
                fields.len()
            ),
        });
    }

    let base_decimals = parse_decimals(ticker, fields[1])?;
    let quote_decimals = parse_decimals(ticker, fields[2])?;

    let config = defi::PoolConfig {
        address: fields[0].to_string(),
        base_decimals,
        quote_decimals,
        invert,
    };
    config.validate()?;

    serde_json::to_string(&config).map_err(|error| DataError::Decode {
        context: "pool metadata",
        error,
    })
}

/// Decode a Raydium compound ticker into vault metadata JSON.
pub fn raydium_metadata_from_ticker(ticker: &str) -> Result<String, DataError> {
    let fields: Vec<&str> = ticker.split(PAIR_DELIMITER).collect();
    if fields.len() < RAYDIUM_TICKER_FIELDS {
        return Err(DataError::MarketParams {
            pair: ticker.to_string(),
            reason: format!(
                "expected at least {RAYDIUM_TICKER_FIELDS} fields, got {}",
                fields.len()
            ),
        });
    }

    for address in [fields[2], fields[4], fields[6], fields[7]] {
        defi::validate_solana_address(address)?;
    }

    let metadata = defi::RaydiumTickerMetadata {
        base_token_vault: defi::AmmTokenVaultMetadata {
            token_vault_address: fields[2].to_string(),
            token_decimals: parse_token_decimals(ticker, fields[3])?,
        },
        quote_token_vault: defi::AmmTokenVaultMetadata {
            token_vault_address: fields[4].to_string(),
            token_decimals: parse_token_decimals(ticker, fields[5])?,
        },
        open_orders_address: fields[6].to_string(),
        amm_info_address: fields[7].to_string(),
    };

    serde_json::to_string(&metadata).map_err(|error| DataError::Decode {
        context: "raydium metadata",
        error,
    })
}

fn parse_decimals(ticker: &str, field: &str) -> Result<i64, DataError> {
    field.parse::<i64>().map_err(|error| DataError::MarketParams {
        pair: ticker.to_string(),
        reason: format!("failed to parse decimals {field}: {error}"),
    })
}

fn parse_token_decimals(ticker: &str, field: &str) -> Result<u64, DataError> {
    field.parse::<u64>().map_err(|error| DataError::MarketParams {
        pair: ticker.to_string(),
        reason: format!("failed to parse decimals {field}: {error}"),
    })
}
