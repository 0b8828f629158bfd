use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bytecode::RiskSeverity;

/// Area a finding or recommendation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    AccessControl,
    Upgradeability,
    ExternalCalls,
    Arithmetic,
    Timing,
    Bytecode,
    CodeQuality,
    Deployer,
    Interaction,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessControl => "Access control",
            Self::Upgradeability => "Upgradeability",
            Self::ExternalCalls => "External calls",
            Self::Arithmetic => "Arithmetic",
            Self::Timing => "Timing",
            Self::Bytecode => "Bytecode",
            Self::CodeQuality => "Code quality",
            Self::Deployer => "Deployer",
            Self::Interaction => "Interaction",
        };
        f.write_str(name)
    }
}

/// A single risk finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    pub severity: RiskSeverity,
    pub category: FindingCategory,
    pub recommendation: String,
}

impl Finding {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: RiskSeverity,
        category: FindingCategory,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            category,
            recommendation: recommendation.into(),
        }
    }
}

/// Code-quality sub-scores, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScores {
    pub documentation: u8,
    pub maintainability: u8,
    pub best_practices: u8,
}

impl QualityScores {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> {
        [
            ("documentation", self.documentation),
            ("maintainability", self.maintainability),
            ("best practices", self.best_practices),
        ]
        .into_iter()
    }
}

impl Default for QualityScores {
    fn default() -> Self {
        Self {
            documentation: 100,
            maintainability: 100,
            best_practices: 100,
        }
    }
}

/// Recommendation grouped under a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: FindingCategory,
    pub priority: RiskSeverity,
    pub text: String,
}
