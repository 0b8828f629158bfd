use super::analyzer::{decode_bytecode, BytecodeAnalyzer};
use super::analyzer_classification::classify_contract;
use super::selectors::UPGRADE_ADMIN_SELECTORS;
use super::types::{ContractType, FunctionSelector};

/// Lowercase markers that identify upgradeable contracts in source code
const SOURCE_UPGRADE_MARKERS: &[&str] = &[
    // delegatecall usage
    "delegatecall(",
    ".delegatecall",
    // upgrade functions
    "function upgradeto(",
    "function upgradetoandcall(",
    "function _authorizeupgrade(",
    "function changeadmin(",
    "function _setimplementation(",
    // inheritance clauses
    "uupsupgradeable",
    "transparentupgradeableproxy",
    "erc1967proxy",
    "erc1967upgrade",
    "beaconproxy",
    "is initializable",
    // import paths
    "@openzeppelin/contracts-upgradeable",
    "@openzeppelin/contracts/proxy/",
    "@openzeppelin/upgrades",
];

impl BytecodeAnalyzer {
    /// Whether logic behind this bytecode can change after analysis.
    ///
    /// True when DELEGATECALL or SELFDESTRUCT is present, when an
    /// upgrade-administration selector is exposed, or when the selectors
    /// classify the contract as a proxy.
    pub fn is_upgradeable(&self, bytecode_hex: &str, selectors: &[FunctionSelector]) -> bool {
        if let Some(code) = decode_bytecode(bytecode_hex) {
            let counters = self.count_opcodes(&code);
            if counters.contains("DELEGATECALL") || counters.contains("SELFDESTRUCT") {
                return true;
            }
        }

        let exposes_admin = selectors.iter().any(|s| {
            let selector = s.selector.trim_start_matches("0x");
            UPGRADE_ADMIN_SELECTORS
                .iter()
                .any(|admin| admin.eq_ignore_ascii_case(selector))
        });

        exposes_admin || classify_contract(selectors) == ContractType::Proxy
    }
}

/// Upgradeability check with the default heuristic analyzer
pub fn is_upgradeable(bytecode_hex: &str, selectors: &[FunctionSelector]) -> bool {
    BytecodeAnalyzer::new().is_upgradeable(bytecode_hex, selectors)
}

/// Case-insensitive lexical search for upgradeability markers in source.
///
/// Purely textual; comments and strings match as well.
pub fn is_upgradeable_from_source(source: &str) -> bool {
    let lowered = source.to_lowercase();
    SOURCE_UPGRADE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
