pub mod analyzer;
pub mod analyzer_classification;
pub mod analyzer_risk;
pub mod analyzer_upgradability;
pub mod opcodes;
pub mod selectors;
pub mod types;
#[cfg(test)]
mod tests;

pub use analyzer::{analyze, decode_bytecode, estimate_complexity, BytecodeAnalyzer};
pub use analyzer_classification::classify_contract;
pub use analyzer_risk::assess_risk;
pub use analyzer_upgradability::{is_upgradeable, is_upgradeable_from_source};
pub use types::*;
