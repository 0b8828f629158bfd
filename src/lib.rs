//! Risk analysis for deployed EVM contracts.
//!
//! [`RiskEngine`] runs the full pipeline: cache lookup, verified source or
//! bytecode fetch, bytecode heuristics, AI-assisted scoring with a local
//! fallback, and score aggregation. The building blocks are public so they
//! can be used on their own.

pub mod api;
pub mod bytecode;
pub mod cache;
pub mod error;
pub mod ethereum;
pub mod inference;
pub mod pipeline;
pub mod risk;

pub use api::{EngineConfig, ProgressEvent, RiskEngine, RiskReport};
pub use bytecode::{BytecodeAnalysisResult, BytecodeAnalyzer, RiskSeverity};
pub use error::RiskError;
pub use pipeline::{Milestone, MilestoneTracker, StepId, StepStatus};
