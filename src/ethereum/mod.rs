// Ethereum Module
//
// This module fetches deployed bytecode over JSON-RPC and verified source
// from Etherscan-compatible explorers.

pub mod chain;
pub mod etherscan;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::Address,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::api::types::EngineConfig;
use chain::{ChainConfig, ChainRegistry};
use etherscan::EtherscanClient;

/// Timeout for explorer requests
pub const EXPLORER_TIMEOUT: Duration = Duration::from_secs(15);

/// Verified contract source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSource {
    pub code: String,
    pub compiler_version: String,
    pub contract_name: String,
}

/// Source of contract code
#[async_trait]
pub trait ContractFetcher: Send + Sync {
    /// Deployed bytecode as `0x`-prefixed hex; `0x` when the address has no
    /// code
    async fn fetch_bytecode(&self, address: &str, chain_id: u64) -> Result<String>;

    /// Verified source, `None` when the contract is not verified
    async fn fetch_verified_source(&self, address: &str, chain_id: u64) -> Result<Option<VerifiedSource>>;
}

/// Interface to an EVM JSON-RPC node
pub struct EthereumConnector {
    provider: Arc<Provider<Http>>,
}

impl EthereumConnector {
    /// Create new Ethereum connector
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid RPC URL {}", rpc_url))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    /// Get deployed bytecode as `0x`-prefixed hex
    pub async fn get_code(&self, address: &str) -> Result<String> {
        let address = Address::from_str(address).map_err(|_| anyhow!("Invalid address {}", address))?;
        let code = self.provider.get_code(address, None).await?;
        Ok(format!("0x{}", hex::encode(code.as_ref())))
    }
}

/// Fetcher that reads bytecode from the chain's RPC node, falling back to the
/// explorer, and verified source from the explorer
pub struct ChainFetcher {
    registry: ChainRegistry,
    explorer_keys: HashMap<u64, String>,
    default_explorer_key: Option<String>,
}

impl ChainFetcher {
    pub fn new(registry: ChainRegistry) -> Self {
        Self {
            registry,
            explorer_keys: HashMap::new(),
            default_explorer_key: None,
        }
    }

    /// Default chains with the RPC overrides and explorer keys of `config`
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = ChainRegistry::new();
        for (chain_id, url) in &config.rpc_urls {
            if !registry.set_rpc_url(*chain_id, url) {
                warn!("RPC URL configured for unknown chain {}", chain_id);
            }
        }

        Self {
            registry,
            explorer_keys: config.explorer_api_keys.clone(),
            default_explorer_key: config.etherscan_api_key.clone(),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    fn chain(&self, chain_id: u64) -> Result<ChainConfig> {
        self.registry
            .get_chain_by_id(chain_id)
            .ok_or_else(|| anyhow!("Unsupported chain {}", chain_id))
    }

    fn explorer(&self, chain: &ChainConfig) -> Result<EtherscanClient> {
        let key = self
            .explorer_keys
            .get(&chain.chain_id)
            .or(self.default_explorer_key.as_ref())
            .cloned();
        EtherscanClient::new(&chain.explorer_api, key, EXPLORER_TIMEOUT)
    }
}

#[async_trait]
impl ContractFetcher for ChainFetcher {
    async fn fetch_bytecode(&self, address: &str, chain_id: u64) -> Result<String> {
        let chain = self.chain(chain_id)?;

        let rpc_result = match EthereumConnector::new(&chain.rpc_url) {
            Ok(connector) => connector.get_code(address).await,
            Err(e) => Err(e),
        };

        match rpc_result {
            Ok(code) => {
                debug!("Fetched {} bytes of code for {} over RPC", code.len() / 2 - 1, address);
                Ok(code)
            }
            Err(e) => {
                warn!("RPC bytecode fetch on {} failed ({}), trying explorer", chain.name, e);
                self.explorer(&chain)?.get_contract_bytecode(address).await
            }
        }
    }

    async fn fetch_verified_source(&self, address: &str, chain_id: u64) -> Result<Option<VerifiedSource>> {
        let chain = self.chain(chain_id)?;
        self.explorer(&chain)?.get_source_code(address).await
    }
}
