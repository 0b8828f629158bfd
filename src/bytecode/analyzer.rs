use log::debug;
use std::collections::HashSet;

use super::analyzer_classification::classify_contract;
use super::analyzer_risk::assess_risk;
use super::opcodes::{self, PUSH4};
use super::selectors;
use super::types::*;

/// Analyzes EVM bytecode for function selectors, opcode usage and risk.
///
/// The scan is a linear walk over the code; it does not follow control flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytecodeAnalyzer {
    /// Decoding mode for PUSH immediates
    scan_mode: ScanMode,
}

impl BytecodeAnalyzer {
    /// Create a new analyzer in heuristic mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new analyzer with an explicit scan mode
    pub fn with_scan_mode(scan_mode: ScanMode) -> Self {
        Self { scan_mode }
    }

    /// Scan mode in use
    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    /// Analyze hex-encoded bytecode.
    ///
    /// Never fails: empty, odd-length or otherwise malformed input produces a
    /// result with `is_contract == false` and no findings.
    pub fn analyze(&self, address: &str, bytecode_hex: &str) -> BytecodeAnalysisResult {
        let mut result = BytecodeAnalysisResult {
            address: address.to_string(),
            bytecode: bytecode_hex.to_string(),
            scan_mode: self.scan_mode,
            ..Default::default()
        };

        let code = match decode_bytecode(bytecode_hex) {
            Some(code) if !code.is_empty() => code,
            Some(_) => return result,
            None => {
                debug!("Bytecode for {} is not valid hex, skipping analysis", address);
                return result;
            }
        };

        let function_selectors = self.extract_selectors(&code);
        let opcode_counters = self.count_opcodes(&code);

        result.is_contract = true;
        result.risk_assessment = assess_risk(&opcode_counters, &function_selectors);
        result.contract_type = classify_contract(&function_selectors);
        result.estimated_complexity = estimate_complexity(&opcode_counters, function_selectors.len());
        result.function_selectors = function_selectors;
        result.opcode_counters = opcode_counters;

        debug!(
            "Analyzed {}: {} bytes, {} selectors, type {}, severity {}",
            address,
            code.len(),
            result.function_selectors.len(),
            result.contract_type,
            result.risk_assessment.severity
        );

        result
    }

    /// Extract known selectors pushed with PUSH4.
    ///
    /// Duplicates collapse to the first occurrence.
    pub fn extract_selectors(&self, code: &[u8]) -> Vec<FunctionSelector> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        let mut i = 0;
        while i < code.len() {
            let opcode = code[i];

            if opcode == PUSH4 && i + 5 <= code.len() {
                let candidate = hex::encode(&code[i + 1..i + 5]);
                if let Some(entry) = selectors::lookup(&candidate) {
                    if seen.insert(entry.selector) {
                        found.push(FunctionSelector::from(entry));
                    }
                }
            }

            i += self.step(opcode);
        }

        found
    }

    /// Count opcode occurrences by mnemonic. Unassigned bytes are skipped.
    pub fn count_opcodes(&self, code: &[u8]) -> OpcodeCounters {
        let mut mnemonics = Vec::with_capacity(code.len());

        let mut i = 0;
        while i < code.len() {
            let opcode = code[i];
            if let Some(name) = opcodes::mnemonic(opcode) {
                mnemonics.push((name, 1));
            }
            i += self.step(opcode);
        }

        mnemonics.into_iter().collect()
    }

    /// Distance to the next byte the scanner reads as an opcode
    fn step(&self, opcode: u8) -> usize {
        match self.scan_mode {
            ScanMode::Heuristic => 1,
            ScanMode::Strict => 1 + opcodes::push_size(opcode).unwrap_or(0),
        }
    }
}

/// Analyze bytecode with the default heuristic analyzer
pub fn analyze(address: &str, bytecode_hex: &str) -> BytecodeAnalysisResult {
    BytecodeAnalyzer::new().analyze(address, bytecode_hex)
}

/// Decode hex bytecode with or without a `0x` prefix.
///
/// Returns `None` for odd-length or non-hex input.
pub fn decode_bytecode(bytecode_hex: &str) -> Option<Vec<u8>> {
    let trimmed = bytecode_hex.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).ok()
}

/// `min(100, round(total_opcodes / 100 + selector_count * 5))`
pub fn estimate_complexity(counters: &OpcodeCounters, selector_count: usize) -> u8 {
    let score = counters.total() as f64 / 100.0 + (selector_count * 5) as f64;
    score.round().min(100.0) as u8
}
