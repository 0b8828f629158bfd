use crate::bytecode::{BytecodeAnalyzer, ScanMode};
use hex_literal::hex;

#[test]
fn test_heuristic_census_counts_push_payload() {
    // PUSH1 0x01 PUSH1 0x00 SSTORE
    let counters = BytecodeAnalyzer::new().count_opcodes(&hex!("6001600055"));

    assert_eq!(counters.get("PUSH1"), 2);
    assert_eq!(counters.get("ADD"), 1);
    assert_eq!(counters.get("STOP"), 1);
    assert_eq!(counters.get("SSTORE"), 1);
    assert_eq!(counters.total(), 5);
}

#[test]
fn test_strict_census_skips_push_payload() {
    let counters = BytecodeAnalyzer::with_scan_mode(ScanMode::Strict).count_opcodes(&hex!("6001600055"));

    assert_eq!(counters.get("PUSH1"), 2);
    assert_eq!(counters.get("ADD"), 0);
    assert_eq!(counters.get("STOP"), 0);
    assert_eq!(counters.get("SSTORE"), 1);
    assert_eq!(counters.total(), 3);
}

#[test]
fn test_unassigned_bytes_are_skipped() {
    let counters = BytecodeAnalyzer::new().count_opcodes(&hex!("0c21ef"));
    assert!(counters.is_empty());
    assert_eq!(counters.total(), 0);
}

#[test]
fn test_strict_census_truncated_push() {
    // PUSH32 with only two payload bytes left
    let counters = BytecodeAnalyzer::with_scan_mode(ScanMode::Strict).count_opcodes(&hex!("7fffff"));
    assert_eq!(counters.get("PUSH32"), 1);
    assert_eq!(counters.total(), 1);
}
