use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical marker a JSON-RPC node returns for an address without code
pub const EMPTY_CODE: &str = "0x";

/// Function selector recovered from dispatcher code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSelector {
    /// 4-byte selector, `0x`-prefixed lowercase hex
    pub selector: String,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub signature: String,
    /// Function name
    pub name: String,
    /// Input types in declaration order
    pub inputs: Vec<String>,
    /// Output types in declaration order
    pub outputs: Vec<String>,
}

/// Occurrence count per opcode mnemonic.
///
/// Built once by the census and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpcodeCounters(BTreeMap<String, u64>);

impl OpcodeCounters {
    /// Count for a mnemonic, zero when absent
    pub fn get(&self, mnemonic: &str) -> u64 {
        self.0.get(mnemonic).copied().unwrap_or(0)
    }

    /// Whether the mnemonic occurred at least once
    pub fn contains(&self, mnemonic: &str) -> bool {
        self.get(mnemonic) > 0
    }

    /// Total number of counted opcodes
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of distinct mnemonics seen
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for OpcodeCounters {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (name, count) in iter {
            *counts.entry(name.into()).or_insert(0) += count;
        }
        Self(counts)
    }
}

/// Severity of a risk assessment or finding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Risk assessment derived from the opcode census and selector list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Overall severity
    pub severity: RiskSeverity,
    /// Findings in detection order
    pub risks: Vec<String>,
    /// Recommendations in detection order
    pub recommendations: Vec<String>,
}

/// Contract classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Erc20,
    Erc721,
    Erc1155,
    Ownable,
    Proxy,
    #[default]
    Custom,
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
            Self::Erc1155 => "erc1155",
            Self::Ownable => "ownable",
            Self::Proxy => "proxy",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// How the scanner treats PUSH immediates.
///
/// `Heuristic` walks every byte, so a byte inside a PUSH payload can be read
/// as an opcode. A payload byte equal to PUSH4 followed by four bytes that
/// happen to form a known selector yields a false-positive selector, and
/// payload bytes inflate the census. `Strict` skips PUSH payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Heuristic,
    Strict,
}

/// Result of one bytecode analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BytecodeAnalysisResult {
    /// Contract address as supplied by the caller
    pub address: String,
    /// Bytecode as supplied by the caller
    pub bytecode: String,
    /// Whether the address holds code
    pub is_contract: bool,
    /// Recognised selectors, one per selector value, first occurrence order
    pub function_selectors: Vec<FunctionSelector>,
    /// Opcode census
    pub opcode_counters: OpcodeCounters,
    /// Risk assessment
    pub risk_assessment: RiskAssessment,
    /// Contract classification
    pub contract_type: ContractType,
    /// Complexity estimate in 0..=100
    pub estimated_complexity: u8,
    /// Decoding mode used for the scan
    pub scan_mode: ScanMode,
}
