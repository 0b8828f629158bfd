// Risk aggregation
//
// Combines heuristic findings, the bytecode assessment and the AI (or
// fallback) score into the final 0-100 safety score, where 100 is safest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{Finding, FindingCategory, QualityScores, Recommendation};
use crate::bytecode::{RiskAssessment, RiskSeverity};
use crate::inference::{FallbackScore, RiskScore};

/// Quality sub-scores below this cost [`QUALITY_PENALTY`] each
pub const QUALITY_THRESHOLD: u8 = 50;
pub const QUALITY_PENALTY: i32 = 5;

/// Points deducted for a finding of the given severity
pub fn severity_penalty(severity: RiskSeverity) -> i32 {
    match severity {
        RiskSeverity::Critical => 30,
        RiskSeverity::High => 20,
        RiskSeverity::Medium => 10,
        RiskSeverity::Low => 5,
    }
}

/// Where the score ceiling came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScoreSource {
    /// Model risk score, higher is more dangerous
    Inference(RiskScore),
    /// Local heuristic safety score
    Fallback(FallbackScore),
}

impl ScoreSource {
    /// Maximum safety score this source allows
    pub fn ceiling(&self) -> u8 {
        match self {
            Self::Inference(risk) => 100 - risk.score.min(100),
            Self::Fallback(fallback) => fallback.score.min(100),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Inference(risk) => &risk.reason,
            Self::Fallback(fallback) => &fallback.reason,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Final safety score in 0..=100
pub fn aggregate(
    source: &ScoreSource,
    bytecode_risk: Option<&RiskAssessment>,
    findings: &[Finding],
    quality: Option<&QualityScores>,
) -> u8 {
    let mut score: i32 = 100;

    score -= findings.iter().map(|f| severity_penalty(f.severity)).sum::<i32>();

    if let Some(assessment) = bytecode_risk.filter(|a| !a.risks.is_empty()) {
        score -= severity_penalty(assessment.severity);
    }

    if let Some(quality) = quality {
        let below = quality.iter().filter(|(_, value)| *value < QUALITY_THRESHOLD).count() as i32;
        score -= below * QUALITY_PENALTY;
    }

    score.min(i32::from(source.ceiling())).clamp(0, 100) as u8
}

/// Severity band for a final score. A critical bytecode assessment forces
/// critical regardless of the score.
pub fn overall_severity(score: u8, bytecode_risk: Option<&RiskAssessment>) -> RiskSeverity {
    if bytecode_risk.map_or(false, |a| a.severity == RiskSeverity::Critical) {
        return RiskSeverity::Critical;
    }
    match score {
        80..=u8::MAX => RiskSeverity::Low,
        60..=79 => RiskSeverity::Medium,
        40..=59 => RiskSeverity::High,
        _ => RiskSeverity::Critical,
    }
}

/// Recommendations grouped by category, highest priority first within each
/// category. Duplicate texts collapse to one entry.
pub fn categorize_recommendations(
    findings: &[Finding],
    bytecode_risk: Option<&RiskAssessment>,
    quality: Option<&QualityScores>,
) -> Vec<Recommendation> {
    let mut grouped: BTreeMap<FindingCategory, Vec<Recommendation>> = BTreeMap::new();
    let mut add = |category: FindingCategory, priority: RiskSeverity, text: &str| {
        let entries = grouped.entry(category).or_default();
        if !entries.iter().any(|r| r.text == text) {
            entries.push(Recommendation {
                category,
                priority,
                text: text.to_string(),
            });
        }
    };

    for finding in findings {
        add(finding.category, finding.severity, &finding.recommendation);
    }

    if let Some(assessment) = bytecode_risk {
        for text in &assessment.recommendations {
            add(FindingCategory::Bytecode, assessment.severity, text);
        }
    }

    if let Some(quality) = quality {
        for (name, value) in quality.iter() {
            if value < QUALITY_THRESHOLD {
                add(
                    FindingCategory::CodeQuality,
                    RiskSeverity::Low,
                    &format!("Improve {} (scored {}/100)", name, value),
                );
            }
        }
    }

    grouped
        .into_values()
        .flat_map(|mut entries| {
            entries.sort_by(|a, b| b.priority.cmp(&a.priority));
            entries
        })
        .collect()
}
