// Chain registry
//
// Default RPC and block explorer endpoints for the EVM chains the engine
// knows about. `RPC_URL_<chain_id>` in the environment overrides the RPC URL.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

use crate::api::config::RPC_URL_PREFIX;

/// Chain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID
    pub chain_id: u64,

    /// Chain name
    pub name: String,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Etherscan-compatible explorer API
    pub explorer_api: String,

    /// Native currency symbol
    pub currency_symbol: String,
}

impl ChainConfig {
    /// Create a new chain configuration
    pub fn new(chain_id: u64, name: &str, rpc_url: &str, explorer_api: &str, currency_symbol: &str) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            rpc_url: rpc_url.to_string(),
            explorer_api: explorer_api.to_string(),
            currency_symbol: currency_symbol.to_string(),
        }
    }

    /// Get Ethereum Mainnet configuration
    pub fn ethereum() -> Self {
        Self::new(1, "Ethereum Mainnet", "https://eth.llamarpc.com", "https://api.etherscan.io/api", "ETH")
    }

    /// Get Sepolia configuration
    pub fn sepolia() -> Self {
        Self::new(
            11155111,
            "Sepolia",
            "https://rpc.sepolia.org",
            "https://api-sepolia.etherscan.io/api",
            "ETH",
        )
    }

    /// Get Polygon configuration
    pub fn polygon() -> Self {
        Self::new(137, "Polygon", "https://polygon-rpc.com", "https://api.polygonscan.com/api", "MATIC")
    }

    /// Get Binance Smart Chain configuration
    pub fn bsc() -> Self {
        Self::new(
            56,
            "Binance Smart Chain",
            "https://bsc-dataseed.binance.org",
            "https://api.bscscan.com/api",
            "BNB",
        )
    }

    /// Get Arbitrum configuration
    pub fn arbitrum() -> Self {
        Self::new(42161, "Arbitrum", "https://arb1.arbitrum.io/rpc", "https://api.arbiscan.io/api", "ETH")
    }

    /// Get Optimism configuration
    pub fn optimism() -> Self {
        Self::new(
            10,
            "Optimism",
            "https://mainnet.optimism.io",
            "https://api-optimistic.etherscan.io/api",
            "ETH",
        )
    }

    /// Get Base configuration
    pub fn base() -> Self {
        Self::new(8453, "Base", "https://mainnet.base.org", "https://api.basescan.org/api", "ETH")
    }

    /// Get Avalanche C-Chain configuration
    pub fn avalanche() -> Self {
        Self::new(
            43114,
            "Avalanche C-Chain",
            "https://api.avax.network/ext/bc/C/rpc",
            "https://api.snowtrace.io/api",
            "AVAX",
        )
    }
}

/// Chain registry for looking up chain configurations
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    /// Map of chain ID to chain configuration
    configs: HashMap<u64, ChainConfig>,
}

impl ChainRegistry {
    /// Create a new chain registry with default configurations
    pub fn new() -> Self {
        let mut registry = Self {
            configs: HashMap::new(),
        };
        for config in [
            ChainConfig::ethereum(),
            ChainConfig::sepolia(),
            ChainConfig::polygon(),
            ChainConfig::bsc(),
            ChainConfig::arbitrum(),
            ChainConfig::optimism(),
            ChainConfig::base(),
            ChainConfig::avalanche(),
        ] {
            registry.add_config(config);
        }
        registry
    }

    /// Chain configuration with the RPC URL taken from `RPC_URL_<chain_id>`
    /// when that variable is set
    pub fn get_chain_by_id(&self, chain_id: u64) -> Option<ChainConfig> {
        let mut config = self.configs.get(&chain_id)?.clone();
        if let Ok(url) = env::var(format!("{}{}", RPC_URL_PREFIX, chain_id)) {
            if !url.trim().is_empty() {
                config.rpc_url = url.trim().to_string();
            }
        }
        Some(config)
    }

    /// Add or update a chain configuration
    pub fn add_config(&mut self, config: ChainConfig) {
        self.configs.insert(config.chain_id, config);
    }

    /// Replace the RPC URL of a known chain. Returns `false` for unknown
    /// chains.
    pub fn set_rpc_url(&mut self, chain_id: u64, rpc_url: &str) -> bool {
        match self.configs.get_mut(&chain_id) {
            Some(config) => {
                config.rpc_url = rpc_url.to_string();
                true
            }
            None => false,
        }
    }

    /// All chains ordered by chain ID
    pub fn chains(&self) -> Vec<&ChainConfig> {
        let mut chains: Vec<&ChainConfig> = self.configs.values().collect();
        chains.sort_by_key(|config| config.chain_id);
        chains
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
