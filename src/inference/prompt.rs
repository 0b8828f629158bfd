// Scoring request construction
//
// The model receives a fixed instruction describing the 0-100 risk scale and
// a JSON feature bundle for the contract under analysis.

use serde::{Deserialize, Serialize};

use crate::bytecode::{ContractType, OpcodeCounters, RiskSeverity};

/// Source longer than this is truncated before it is sent
pub const MAX_SOURCE_CHARS: usize = 12_000;

const SYSTEM_INSTRUCTION: &str = "You are a smart contract security auditor. \
Rate the risk of the contract described by the user message on a scale from 0 to 100, \
where 0 means no meaningful risk and 100 means the contract is almost certainly dangerous. \
Scoring rules are monotonic: \
a heuristic severity of high or critical puts the score at 70 or above; \
has_selfdestruct or has_callcode puts the score at 60 or above; \
has_delegatecall or has_create2 puts the score at 40 or above unless the contract is a well-known proxy standard. \
More dangerous signals never lower the score. \
Reply with a single JSON object and nothing else: {\"score\": <integer 0-100>, \"reason\": \"<one or two sentences>\"}";

/// Signals about one contract that are sent to the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFeatures {
    pub address: String,
    pub chain_id: u64,
    pub is_verified: bool,
    pub contract_name: Option<String>,
    pub contract_type: Option<ContractType>,
    pub is_upgradeable: bool,
    /// Highest severity found by local heuristics
    pub heuristic_severity: RiskSeverity,
    pub heuristic_findings: Vec<String>,
    pub opcode_counters: OpcodeCounters,
    /// Signatures of recognised functions
    pub functions: Vec<String>,
    pub source: Option<String>,
}

/// Dangerous-capability flags derived from the opcode census, or from the
/// source when no census is available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFlags {
    pub has_delegatecall: bool,
    pub has_callcode: bool,
    pub has_selfdestruct: bool,
    pub has_create2: bool,
}

impl DerivedFlags {
    pub fn from_features(features: &RiskFeatures) -> Self {
        let counters = &features.opcode_counters;
        let source = features.source.as_deref().unwrap_or_default().to_lowercase();

        Self {
            has_delegatecall: counters.contains("DELEGATECALL") || source.contains("delegatecall"),
            has_callcode: counters.contains("CALLCODE") || source.contains("callcode"),
            has_selfdestruct: counters.contains("SELFDESTRUCT")
                || source.contains("selfdestruct")
                || source.contains("suicide("),
            has_create2: counters.contains("CREATE2") || source.contains("create2"),
        }
    }
}

/// OpenAI-compatible chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Serialize)]
struct FeatureBundle<'a> {
    #[serde(flatten)]
    features: &'a RiskFeatures,
    #[serde(flatten)]
    flags: DerivedFlags,
}

/// Build the chat request for a model
pub fn build_request(model: &str, features: &RiskFeatures) -> Result<ChatRequest, serde_json::Error> {
    let mut features = features.clone();
    features.source = features.source.map(truncate_source);

    let bundle = FeatureBundle {
        flags: DerivedFlags::from_features(&features),
        features: &features,
    };

    Ok(ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_INSTRUCTION.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: serde_json::to_string(&bundle)?,
            },
        ],
        temperature: 0.0,
    })
}

fn truncate_source(source: String) -> String {
    if source.chars().count() <= MAX_SOURCE_CHARS {
        return source;
    }
    let mut truncated: String = source.chars().take(MAX_SOURCE_CHARS).collect();
    truncated.push_str("\n// [truncated]");
    truncated
}
