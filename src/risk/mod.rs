// Risk Module
//
// Source heuristics, auxiliary analyses and the aggregation that turns all
// signals into the final safety score.

pub mod aggregator;
pub mod auxiliary;
pub mod heuristics;
pub mod types;

pub use aggregator::{aggregate, categorize_recommendations, overall_severity, ScoreSource};
pub use auxiliary::{AuxiliaryAnalysis, NoopAnalysis};
pub use heuristics::{scan_source, SourceScan};
pub use types::{Finding, FindingCategory, QualityScores, Recommendation};
