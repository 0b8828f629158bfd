// Contract Risk API Types
//
// Configuration and report types shared by the engine, the CLI and the
// cache.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::bytecode::{BytecodeAnalysisResult, RiskSeverity, ScanMode};
use crate::inference::ranking::OFFICIAL_PROVIDERS;
use crate::pipeline::Milestone;
use crate::risk::{Finding, QualityScores, Recommendation};

/// Inference service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Hex private key used to sign requests. Read but never written.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    /// OpenAI-compatible endpoint served through the static broker
    pub endpoint: Option<String>,

    /// Model requested from the static endpoint
    pub model: String,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Providers ranked first when they run in a TEE
    pub official_providers: Vec<String>,

    /// Amount funded into the ledger on first use
    pub ledger_deposit: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            endpoint: None,
            model: "llama-3.3-70b-instruct".to_string(),
            api_key: None,
            timeout_secs: 30,
            official_providers: OFFICIAL_PROVIDERS.iter().map(|s| s.to_string()).collect(),
            ledger_deposit: 0.1,
        }
    }
}

/// Report cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// TTL for contracts whose code cannot change, in seconds
    pub default_ttl_secs: u64,

    /// TTL for upgradeable contracts, in seconds
    pub upgradeable_ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self, is_upgradeable: bool) -> Duration {
        if is_upgradeable {
            Duration::from_secs(self.upgradeable_ttl_secs)
        } else {
            Duration::from_secs(self.default_ttl_secs)
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_secs: 24 * 60 * 60,
            upgradeable_ttl_secs: 60 * 60,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub inference: InferenceConfig,

    pub cache: CacheConfig,

    /// Bytecode decoding mode
    pub scan_mode: ScanMode,

    /// Upper bound on one analysis run, in seconds
    pub run_deadline_secs: u64,

    /// Explorer API key used for chains without a specific key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etherscan_api_key: Option<String>,

    /// Explorer API keys by chain ID
    pub explorer_api_keys: HashMap<u64, String>,

    /// RPC URL overrides by chain ID
    pub rpc_urls: HashMap<u64, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            cache: CacheConfig::default(),
            scan_mode: ScanMode::Heuristic,
            run_deadline_secs: 120,
            etherscan_api_key: None,
            explorer_api_keys: HashMap::new(),
            rpc_urls: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    /// Explorer API key for a chain, falling back to the shared key
    pub fn explorer_api_key(&self, chain_id: u64) -> Option<&str> {
        self.explorer_api_keys
            .get(&chain_id)
            .or(self.etherscan_api_key.as_ref())
            .map(String::as_str)
    }
}

/// Risk report for one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Contract address, lowercase
    pub address: String,

    pub chain_id: u64,

    /// Safety score, 0 (dangerous) to 100 (safe)
    pub score: u8,

    pub severity: RiskSeverity,

    pub findings: Vec<Finding>,

    pub recommendations: Vec<Recommendation>,

    /// Milestone snapshot at the end of the run
    pub milestones: Vec<Milestone>,

    /// Whether verified source was available
    pub is_verified: bool,

    pub contract_name: Option<String>,

    pub is_upgradeable: bool,

    /// Explanation from the model, or from the fallback heuristic
    pub reason: String,

    /// Whether the local fallback replaced AI scoring
    pub used_fallback: bool,

    pub quality: Option<QualityScores>,

    /// Bytecode analysis for unverified contracts
    pub bytecode_analysis: Option<BytecodeAnalysisResult>,

    /// RFC 3339 timestamp of the analysis
    pub timestamp: String,

    /// Whether the report was served from the cache
    #[serde(default)]
    pub from_cache: bool,
}

/// Progress snapshot emitted after every milestone transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub overall: u8,
    pub current: Option<Milestone>,
    /// Visible milestones
    pub milestones: Vec<Milestone>,
    pub is_complete: bool,
}
