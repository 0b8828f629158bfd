// Local fallback scoring
//
// Deterministic safety score used when AI scoring is unavailable. Unlike the
// model's risk score, higher is safer.

use serde::{Deserialize, Serialize};

use crate::bytecode::OpcodeCounters;

pub const VERIFIED_BASE_SCORE: i32 = 60;
pub const UNVERIFIED_BASE_SCORE: i32 = 40;

/// What the fallback heuristic can look at
#[derive(Debug, Clone, Copy)]
pub enum FallbackInput<'a> {
    Source(&'a str),
    Bytecode(&'a OpcodeCounters),
}

/// Safety score from the local heuristic, 0 (dangerous) to 100 (safe)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackScore {
    pub score: u8,
    pub reason: String,
}

struct Adjustment {
    delta: i32,
    label: &'static str,
}

const GOOD_PRACTICE_BONUS: i32 = 5;

/// Score a contract without the inference service
pub fn fallback_score(input: FallbackInput<'_>, is_verified: bool) -> FallbackScore {
    let base = if is_verified { VERIFIED_BASE_SCORE } else { UNVERIFIED_BASE_SCORE };

    let adjustments = match input {
        FallbackInput::Source(source) => source_adjustments(source),
        FallbackInput::Bytecode(counters) => bytecode_adjustments(counters),
    };

    let total = adjustments.iter().fold(base, |acc, a| acc + a.delta);
    let score = total.clamp(0, 100) as u8;

    let mut reason = String::from("AI scoring unavailable; local heuristic score");
    if adjustments.is_empty() {
        reason.push_str(&format!(" (base {})", base));
    } else {
        let details: Vec<String> = adjustments
            .iter()
            .map(|a| format!("{} {:+}", a.label, a.delta))
            .collect();
        reason.push_str(&format!(" (base {}: {})", base, details.join(", ")));
    }

    FallbackScore { score, reason }
}

fn source_adjustments(source: &str) -> Vec<Adjustment> {
    let code = source.to_lowercase();
    let has = |marker: &str| code.contains(marker);
    let mut adjustments = Vec::new();
    let mut push = |applies: bool, delta: i32, label: &'static str| {
        if applies {
            adjustments.push(Adjustment { delta, label });
        }
    };

    push(has("onlyowner") || has("ownable"), GOOD_PRACTICE_BONUS, "ownership guard");
    push(has("pausable") || has("whennotpaused"), GOOD_PRACTICE_BONUS, "pause guard");
    push(has("emit "), GOOD_PRACTICE_BONUS, "events");
    push(has("modifier "), GOOD_PRACTICE_BONUS, "modifiers");

    push(has("delegatecall"), -15, "delegatecall");
    push(has("selfdestruct") || has("suicide("), -20, "self-destruct");
    push(has("assembly"), -10, "inline assembly");
    push(has("unchecked"), -10, "unchecked arithmetic");

    let low_level_call = has(".call{") || has(".call(") || has(".call.value(");
    let reentrancy_guard = has("nonreentrant") || has("reentrancyguard");
    push(low_level_call && !reentrancy_guard, -15, "low-level call without reentrancy guard");

    adjustments
}

fn bytecode_adjustments(counters: &OpcodeCounters) -> Vec<Adjustment> {
    let mut adjustments = Vec::new();
    let mut push = |applies: bool, delta: i32, label: &'static str| {
        if applies {
            adjustments.push(Adjustment { delta, label });
        }
    };

    let emits_events = ["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"]
        .iter()
        .any(|log| counters.contains(log));
    push(emits_events, GOOD_PRACTICE_BONUS, "events");

    push(counters.contains("DELEGATECALL"), -15, "delegatecall");
    push(counters.contains("SELFDESTRUCT"), -20, "self-destruct");
    push(counters.contains("CALLCODE"), -10, "callcode");
    push(
        counters.contains("CALL") && counters.contains("SSTORE"),
        -15,
        "external call with storage writes",
    );

    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_scores() {
        assert_eq!(fallback_score(FallbackInput::Source(""), true).score, 60);
        assert_eq!(fallback_score(FallbackInput::Source(""), false).score, 40);
        assert_eq!(
            fallback_score(FallbackInput::Bytecode(&OpcodeCounters::default()), false).score,
            40
        );
    }

    #[test]
    fn test_good_practices_raise_score() {
        let source = r#"
            contract Vault is Ownable, Pausable {
                modifier onlyKeeper() { _; }
                function pause() external onlyOwner { _pause(); emit Paused(msg.sender); }
            }
        "#;
        let result = fallback_score(FallbackInput::Source(source), true);
        assert_eq!(result.score, 80);
        assert!(result.reason.contains("ownership guard +5"));
    }

    #[test]
    fn test_danger_markers_lower_score() {
        let source = r#"
            contract Proxy {
                function forward(address impl) external {
                    (bool ok, ) = impl.delegatecall(msg.data);
                    assembly { let x := 1 }
                    unchecked { counter++; }
                    payable(msg.sender).call{value: 1}("");
                }
                function kill() external { selfdestruct(payable(msg.sender)); }
            }
        "#;
        // 60 - 15 - 20 - 10 - 10 - 15
        let result = fallback_score(FallbackInput::Source(source), true);
        assert_eq!(result.score, 0);
        assert!(result.reason.starts_with("AI scoring unavailable"));
    }

    #[test]
    fn test_reentrancy_guard_cancels_call_penalty() {
        let guarded = "contract A is ReentrancyGuard { function f() nonReentrant { to.call{value: 1}(\"\"); } }";
        let unguarded = "contract A { function f() { to.call{value: 1}(\"\"); } }";

        assert_eq!(fallback_score(FallbackInput::Source(guarded), false).score, 40);
        assert_eq!(fallback_score(FallbackInput::Source(unguarded), false).score, 25);
    }

    #[test]
    fn test_bytecode_markers() {
        let counters: OpcodeCounters = [("DELEGATECALL", 1), ("LOG1", 3)].into_iter().collect();
        assert_eq!(fallback_score(FallbackInput::Bytecode(&counters), false).score, 30);

        let counters: OpcodeCounters = [("SELFDESTRUCT", 1), ("CALL", 1), ("SSTORE", 1), ("CALLCODE", 1)]
            .into_iter()
            .collect();
        assert_eq!(fallback_score(FallbackInput::Bytecode(&counters), false).score, 0);
    }

    #[test]
    fn test_score_always_in_range() {
        for verified in [true, false] {
            let source = "delegatecall selfdestruct assembly unchecked .call( ".repeat(10);
            let score = fallback_score(FallbackInput::Source(&source), verified).score;
            assert!(score <= 100);
        }
    }
}
