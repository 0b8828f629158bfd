mod census;

use crate::bytecode::analyze;

#[test]
fn test_is_contract_marker() {
    assert!(!analyze("0x0", "").is_contract);
    assert!(!analyze("0x0", "0x").is_contract);
    assert!(!analyze("0x0", "  0x  ").is_contract);
    assert!(analyze("0x1", "0x6000").is_contract);
    assert!(analyze("0x1", "6000").is_contract);
}

#[test]
fn test_malformed_bytecode_yields_empty_result() {
    for input in ["0x600", "zz", "0xgg00", "6"] {
        let result = analyze("0x1", input);
        assert!(!result.is_contract, "{} should not be a contract", input);
        assert!(result.function_selectors.is_empty());
        assert!(result.opcode_counters.is_empty());
        assert!(result.risk_assessment.risks.is_empty());
        assert_eq!(result.estimated_complexity, 0);
    }
}

#[test]
fn test_result_echoes_inputs() {
    let result = analyze("0xabc", "0x6000");
    assert_eq!(result.address, "0xabc");
    assert_eq!(result.bytecode, "0x6000");
}
