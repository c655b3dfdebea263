use crate::error::DataError;
use serde::{Deserialize, Serialize};

/// Name of the Raydium price provider.
pub const RAYDIUM_NAME: &str = "raydium_api";

/// Prefix shared by every UniswapV3 provider name; the suffix selects the chain.
pub const UNISWAPV3_BASE_NAME: &str = "uniswapv3_api";

/// Name of the UniswapV3 provider reading Ethereum mainnet pools.
pub const UNISWAPV3_ETHEREUM_NAME: &str = "uniswapv3_api-ethereum";

/// Name of the UniswapV3 provider reading Base pools.
pub const UNISWAPV3_BASE_CHAIN_NAME: &str = "uniswapv3_api-base";

/// Name of the PancakeSwap price provider.
pub const PANCAKESWAP_NAME: &str = "pancakeswap_api";

/// Pool descriptor carried as provider metadata for UniswapV3 and PancakeSwap markets.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PoolConfig {
    pub address: String,
    pub base_decimals: i64,
    pub quote_decimals: i64,
    pub invert: bool,
}

impl PoolConfig {
    /// Check the pool address is a well-formed EVM address.
    pub fn validate(&self) -> Result<(), DataError> {
        let Some(stripped) = self.address.strip_prefix("0x") else {
            return Err(DataError::MarketParams {
                pair: self.address.clone(),
                reason: "pool address missing 0x prefix".to_string(),
            });
        };

        let decoded = hex::decode(stripped).map_err(|error| DataError::MarketParams {
            pair: self.address.clone(),
            reason: format!("pool address is not hex: {error}"),
        })?;

        if decoded.len() != 20 {
            return Err(DataError::MarketParams {
                pair: self.address.clone(),
                reason: format!("pool address is {} bytes, expected 20", decoded.len()),
            });
        }

        Ok(())
    }
}

/// One side of a Raydium AMM: the vault address holding the token plus its decimals.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct AmmTokenVaultMetadata {
    pub token_vault_address: String,
    pub token_decimals: u64,
}

/// Vault descriptor carried as provider metadata for Raydium markets.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct RaydiumTickerMetadata {
    pub base_token_vault: AmmTokenVaultMetadata,
    pub quote_token_vault: AmmTokenVaultMetadata,
    pub open_orders_address: String,
    pub amm_info_address: String,
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Check an address has the shape of a base58-encoded Solana public key.
pub fn validate_solana_address(address: &str) -> Result<(), DataError> {
    if !(32..=44).contains(&address.len())
        || !address.chars().all(|c| BASE58_ALPHABET.contains(c))
    {
        return Err(DataError::MarketParams {
            pair: address.to_string(),
            reason: "not a base58 solana address".to_string(),
        });
    }
    Ok(())
}
