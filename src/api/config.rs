// Configuration for Contract Risk
//
// This module loads, saves and builds engine configuration and overlays
// environment variables on top of it.

use crate::api::types::EngineConfig;
use crate::bytecode::ScanMode;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::env;
use std::fs;
use std::path::Path;

/// Prefix of per-chain RPC URL overrides, e.g. `RPC_URL_137`
pub const RPC_URL_PREFIX: &str = "RPC_URL_";

/// Configuration manager for Contract Risk
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&config_str)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<()> {
        let config_str = serde_json::to_string_pretty(config)?;
        fs::write(path.as_ref(), config_str)
            .with_context(|| format!("Failed to write config file {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load the file when given, else defaults, then apply the environment
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<EngineConfig> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => EngineConfig::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Create a builder for configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl EngineConfig {
    /// Overlay configuration from environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(env::vars())
    }

    fn apply_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }

            match name.as_str() {
                "INFERENCE_PRIVATE_KEY" => self.inference.private_key = Some(value),
                "INFERENCE_ENDPOINT" => self.inference.endpoint = Some(value),
                "INFERENCE_MODEL" => self.inference.model = value,
                "INFERENCE_API_KEY" => self.inference.api_key = Some(value),
                "INFERENCE_TIMEOUT_SECS" => {
                    self.inference.timeout_secs = value
                        .parse()
                        .with_context(|| format!("INFERENCE_TIMEOUT_SECS is not a number: {}", value))?;
                }
                "ETHERSCAN_API_KEY" => self.etherscan_api_key = Some(value),
                other => {
                    if let Some(chain) = other.strip_prefix(RPC_URL_PREFIX) {
                        match chain.parse::<u64>() {
                            Ok(chain_id) => {
                                debug!("RPC URL override for chain {}", chain_id);
                                self.rpc_urls.insert(chain_id, value);
                            }
                            Err(_) => warn!("Ignoring {}: not a chain ID", other),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Builder for creating configurations
#[derive(Default)]
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    /// Set the signing key for inference requests
    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.config.inference.private_key = Some(key.into());
        self
    }

    /// Set the static inference endpoint and model
    pub fn endpoint(mut self, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        self.config.inference.endpoint = Some(endpoint.into());
        self.config.inference.model = model.into();
        self
    }

    /// Set the per-request inference timeout
    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference.timeout_secs = secs;
        self
    }

    /// Set the official provider allow-list
    pub fn official_providers(mut self, providers: Vec<String>) -> Self {
        self.config.inference.official_providers = providers;
        self
    }

    /// Enable or disable the report cache
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    /// Set cache TTLs for immutable and upgradeable contracts
    pub fn cache_ttls(mut self, default_secs: u64, upgradeable_secs: u64) -> Self {
        self.config.cache.default_ttl_secs = default_secs;
        self.config.cache.upgradeable_ttl_secs = upgradeable_secs;
        self
    }

    /// Set the bytecode decoding mode
    pub fn scan_mode(mut self, mode: ScanMode) -> Self {
        self.config.scan_mode = mode;
        self
    }

    /// Set the per-run deadline
    pub fn run_deadline_secs(mut self, secs: u64) -> Self {
        self.config.run_deadline_secs = secs;
        self
    }

    /// Set the shared explorer API key
    pub fn etherscan_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.etherscan_api_key = Some(key.into());
        self
    }

    /// Override the RPC URL of a chain
    pub fn rpc_url(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.config.rpc_urls.insert(chain_id, url.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
