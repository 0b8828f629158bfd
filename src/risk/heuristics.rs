// Source heuristics
//
// Lexical checks over verified Solidity source. Comments are stripped before
// pattern matching; string literals are not, so a pattern inside a string
// still matches.

use log::debug;
use serde::{Deserialize, Serialize};

use super::types::{Finding, FindingCategory, QualityScores};
use crate::bytecode::RiskSeverity;

/// Findings and quality scores for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScan {
    pub findings: Vec<Finding>,
    pub quality: QualityScores,
}

/// Scan verified source for risky patterns and score its quality
pub fn scan_source(source: &str) -> SourceScan {
    let code = strip_comments(source);
    let lowered = code.to_lowercase();
    let findings = detect_findings(&code, &lowered);

    let quality = QualityScores {
        documentation: documentation_score(source),
        maintainability: maintainability_score(&code),
        best_practices: best_practices_score(&lowered, &findings),
    };

    debug!(
        "Source scan found {} findings, quality {:?}",
        findings.len(),
        quality
    );

    SourceScan { findings, quality }
}

fn detect_findings(code: &str, lowered: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if lowered.contains("tx.origin") {
        findings.push(Finding::new(
            "tx.origin used for authorization",
            "tx.origin identifies the transaction sender, so any contract the owner calls can act with the owner's authority",
            RiskSeverity::High,
            FindingCategory::AccessControl,
            "Use msg.sender for authorization checks",
        ));
    }

    if lowered.contains("selfdestruct") || lowered.contains("suicide(") {
        findings.push(Finding::new(
            "Contract can self-destruct",
            "selfdestruct removes the contract and forwards its balance",
            RiskSeverity::High,
            FindingCategory::Upgradeability,
            "Remove selfdestruct or restrict it behind a timelocked owner",
        ));
    }

    if lowered.contains("delegatecall") {
        findings.push(Finding::new(
            "Uses delegatecall",
            "delegatecall runs external code against this contract's storage",
            RiskSeverity::Medium,
            FindingCategory::Upgradeability,
            "Make sure delegatecall targets are fixed or controlled by a trusted admin",
        ));
    }

    if lowered.contains("assembly") {
        findings.push(Finding::new(
            "Inline assembly",
            "Assembly bypasses the compiler's safety checks",
            RiskSeverity::Low,
            FindingCategory::CodeQuality,
            "Review every assembly block for memory and storage safety",
        ));
    }

    if lowered.contains("unchecked") {
        findings.push(Finding::new(
            "Unchecked arithmetic",
            "Arithmetic inside unchecked blocks wraps on overflow",
            RiskSeverity::Low,
            FindingCategory::Arithmetic,
            "Confirm that unchecked blocks cannot overflow or underflow",
        ));
    }

    let low_level_call = lowered.contains(".call{") || lowered.contains(".call(") || lowered.contains(".call.value(");
    let guarded = lowered.contains("nonreentrant") || lowered.contains("reentrancyguard");
    if low_level_call && !guarded {
        findings.push(Finding::new(
            "Low-level call without reentrancy guard",
            "External calls through .call can re-enter the contract before state is updated",
            RiskSeverity::High,
            FindingCategory::ExternalCalls,
            "Apply checks-effects-interactions or a reentrancy guard",
        ));
    }

    if lowered.contains("block.timestamp") || contains_word(lowered, "now") {
        findings.push(Finding::new(
            "Timestamp dependence",
            "Block timestamps can be shifted slightly by block producers",
            RiskSeverity::Low,
            FindingCategory::Timing,
            "Avoid using block.timestamp for randomness or tight deadlines",
        ));
    }

    if has_floating_pragma(code) {
        findings.push(Finding::new(
            "Floating pragma",
            "The contract may be compiled with a different compiler version than it was tested with",
            RiskSeverity::Low,
            FindingCategory::CodeQuality,
            "Pin the compiler version",
        ));
    }

    findings
}

fn has_floating_pragma(code: &str) -> bool {
    code.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("pragma solidity"))
        .any(|line| line.contains('^') || line.contains('>') || line.contains('<'))
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .any(|token| token == word)
}

/// Remove `//` and `/* */` comments, keeping line structure
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_block = false;

    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            } else if c == '\n' {
                out.push('\n');
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                in_block = true;
            }
            _ => out.push(c),
        }
    }

    out
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
}

fn documentation_score(source: &str) -> u8 {
    let lines: Vec<&str> = source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return 0;
    }

    let comments = lines.iter().filter(|line| is_comment_line(line)).count();
    // One comment line per four lines scores full marks
    let ratio = comments as f64 / lines.len() as f64;
    (ratio * 400.0).round().min(100.0) as u8
}

fn maintainability_score(code: &str) -> u8 {
    let code_lines = code.lines().filter(|line| !line.trim().is_empty()).count();
    let functions = code.matches("function ").count().max(1);
    let lines_per_function = code_lines / functions;

    let mut score: i32 = 100;
    if lines_per_function > 50 {
        score -= 30;
    } else if lines_per_function > 30 {
        score -= 15;
    }

    if code_lines > 2000 {
        score -= 20;
    } else if code_lines > 1000 {
        score -= 10;
    }

    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;
    for c in code.chars() {
        match c {
            '{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            '}' => depth -= 1,
            _ => {}
        }
    }
    if max_depth > 6 {
        score -= 10;
    }

    score.clamp(0, 100) as u8
}

fn best_practices_score(lowered: &str, findings: &[Finding]) -> u8 {
    let mut score: i32 = 100;
    for finding in findings {
        score -= match finding.severity {
            RiskSeverity::Critical | RiskSeverity::High => 15,
            RiskSeverity::Medium => 10,
            RiskSeverity::Low => 5,
        };
    }
    if !lowered.contains("emit ") {
        score -= 10;
    }
    if !lowered.contains("require(") && !lowered.contains("revert") {
        score -= 10;
    }
    score.clamp(0, 100) as u8
}
