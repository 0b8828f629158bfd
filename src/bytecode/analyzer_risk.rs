use super::types::{FunctionSelector, OpcodeCounters, RiskAssessment, RiskSeverity};

/// SELFDESTRUCT count above which the contract is flagged as do-not-interact
pub const SELFDESTRUCT_CRITICAL_THRESHOLD: u64 = 100;

/// SELFDESTRUCT count above which the contract is at least high risk
pub const SELFDESTRUCT_HIGH_THRESHOLD: u64 = 10;

/// Selector count above which missing access-control functions is reported
pub const ACCESS_CONTROL_SELECTOR_THRESHOLD: usize = 5;

const ACCESS_CONTROL_MARKERS: [&str; 3] = ["owner", "role", "admin"];

/// Apply the ordered risk rules to an opcode census and selector list.
///
/// Severity follows the finding count (1 low, 2 medium, 3+ high). Only the
/// self-destruct tiers can push it further: above
/// [`SELFDESTRUCT_HIGH_THRESHOLD`] it is at least high, above
/// [`SELFDESTRUCT_CRITICAL_THRESHOLD`] it is critical.
pub fn assess_risk(counters: &OpcodeCounters, selectors: &[FunctionSelector]) -> RiskAssessment {
    let mut risks = Vec::new();
    let mut recommendations = Vec::new();
    let mut floor = RiskSeverity::Low;

    let self_destructs = counters.get("SELFDESTRUCT");
    if self_destructs > SELFDESTRUCT_CRITICAL_THRESHOLD {
        risks.push(format!(
            "SELFDESTRUCT appears {} times; the bytecode looks degenerate or deliberately obfuscated",
            self_destructs
        ));
        recommendations.push(
            "Do not interact with this contract: it can be destroyed through many code paths".to_string(),
        );
        floor = RiskSeverity::Critical;
    } else if self_destructs > SELFDESTRUCT_HIGH_THRESHOLD {
        risks.push(format!("SELFDESTRUCT appears {} times", self_destructs));
        recommendations.push(
            "Treat this contract as high risk: several self-destruct paths exist".to_string(),
        );
        floor = RiskSeverity::High;
    } else if self_destructs >= 1 {
        risks.push("Contract can self-destruct".to_string());
        recommendations.push(
            "Verify that self-destruct is restricted to a trusted owner".to_string(),
        );
    }

    if counters.contains("DELEGATECALL") {
        risks.push("Uses DELEGATECALL (proxy pattern)".to_string());
        recommendations.push(
            "Review the implementation behind the proxy; its logic can change after analysis".to_string(),
        );
    }

    if counters.contains("CREATE") || counters.contains("CREATE2") {
        risks.push("Can deploy other contracts (factory pattern)".to_string());
        recommendations.push("Review the contracts this factory deploys".to_string());
    }

    let has_external_call = counters.contains("CALL") || counters.contains("CALLCODE");
    if has_external_call && counters.contains("SSTORE") {
        risks.push("Potential reentrancy: external calls and storage writes in the same contract".to_string());
        recommendations.push(
            "Check that state is updated before external calls or that a reentrancy guard is used".to_string(),
        );
    }

    if selectors.len() > ACCESS_CONTROL_SELECTOR_THRESHOLD && !has_access_control_selector(selectors) {
        risks.push("No access control functions detected".to_string());
        recommendations.push(
            "Confirm that privileged functions are restricted to authorized callers".to_string(),
        );
    }

    let by_count = match risks.len() {
        0 | 1 => RiskSeverity::Low,
        2 => RiskSeverity::Medium,
        _ => RiskSeverity::High,
    };

    RiskAssessment {
        severity: by_count.max(floor),
        risks,
        recommendations,
    }
}

fn has_access_control_selector(selectors: &[FunctionSelector]) -> bool {
    selectors.iter().any(|selector| {
        let name = selector.name.to_lowercase();
        ACCESS_CONTROL_MARKERS.iter().any(|marker| name.contains(marker))
    })
}
