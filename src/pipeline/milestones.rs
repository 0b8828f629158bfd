// Milestone tracking
//
// Dependency-gated progress model for one analysis run. The full step set is
// fixed when the tracker is created; a step becomes visible once all of its
// dependencies have completed.

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline step identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    CheckCache,
    FetchSource,
    FetchBytecode,
    BytecodeAnalysis,
    AiAnalysis,
    DeployerAnalysis,
    InteractionAnalysis,
    RiskCalculation,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckCache => "check_cache",
            Self::FetchSource => "fetch_source",
            Self::FetchBytecode => "fetch_bytecode",
            Self::BytecodeAnalysis => "bytecode_analysis",
            Self::AiAnalysis => "ai_analysis",
            Self::DeployerAnalysis => "deployer_analysis",
            Self::InteractionAnalysis => "interaction_analysis",
            Self::RiskCalculation => "risk_calculation",
        }
    }

    fn initial_message(&self) -> &'static str {
        match self {
            Self::CheckCache => "Checking cache",
            Self::FetchSource => "Fetching verified source",
            Self::FetchBytecode => "Fetching bytecode",
            Self::BytecodeAnalysis => "Analyzing bytecode",
            Self::AiAnalysis => "Scoring with AI",
            Self::DeployerAnalysis => "Analyzing deployer",
            Self::InteractionAnalysis => "Analyzing interactions",
            Self::RiskCalculation => "Calculating risk score",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = match s {
            "check_cache" => Self::CheckCache,
            "fetch_source" => Self::FetchSource,
            "fetch_bytecode" => Self::FetchBytecode,
            "bytecode_analysis" => Self::BytecodeAnalysis,
            "ai_analysis" => Self::AiAnalysis,
            "deployer_analysis" => Self::DeployerAnalysis,
            "interaction_analysis" => Self::InteractionAnalysis,
            "risk_calculation" => Self::RiskCalculation,
            other => return Err(format!("unknown milestone id: {}", other)),
        };
        Ok(id)
    }
}

/// Milestone status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    /// Completed and failed are final for the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One stage of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: StepId,
    pub depends_on: Vec<StepId>,
    pub status: StepStatus,
    /// Progress percentage in 0..=100
    pub progress: u8,
    pub message: String,
    /// RFC 3339 timestamp of the last transition
    pub timestamp: String,
}

impl Milestone {
    fn new(id: StepId, depends_on: &[StepId]) -> Self {
        Self {
            id,
            depends_on: depends_on.to_vec(),
            status: StepStatus::Pending,
            progress: 0,
            message: id.initial_message().to_string(),
            timestamp: now(),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Dependency-gated progress tracker for one analysis run
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    is_verified: bool,
    /// Steps in topological order
    milestones: Vec<Milestone>,
}

impl MilestoneTracker {
    /// Create a tracker for a verified (source available) or unverified
    /// (bytecode only) contract
    pub fn new(is_verified: bool) -> Self {
        use StepId::*;

        let milestones = if is_verified {
            vec![
                Milestone::new(CheckCache, &[]),
                Milestone::new(FetchSource, &[CheckCache]),
                Milestone::new(AiAnalysis, &[FetchSource]),
                Milestone::new(DeployerAnalysis, &[FetchSource]),
                Milestone::new(InteractionAnalysis, &[FetchSource]),
                Milestone::new(RiskCalculation, &[AiAnalysis, DeployerAnalysis, InteractionAnalysis]),
            ]
        } else {
            vec![
                Milestone::new(CheckCache, &[]),
                Milestone::new(FetchBytecode, &[CheckCache]),
                Milestone::new(BytecodeAnalysis, &[FetchBytecode]),
                Milestone::new(AiAnalysis, &[BytecodeAnalysis]),
                Milestone::new(DeployerAnalysis, &[FetchBytecode]),
                Milestone::new(InteractionAnalysis, &[FetchBytecode]),
                Milestone::new(RiskCalculation, &[AiAnalysis, DeployerAnalysis, InteractionAnalysis]),
            ]
        };

        Self { is_verified, milestones }
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    /// Every step, visible or not, in topological order
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Status of a step, `None` when the step is not part of this topology
    pub fn status(&self, id: StepId) -> Option<StepStatus> {
        self.find(id).map(|m| m.status)
    }

    /// Mark a step as in progress
    pub fn start_step(&mut self, id: StepId) {
        if let Some(step) = self.open_step(id) {
            step.status = StepStatus::InProgress;
            step.timestamp = now();
            debug!("Milestone {} started", id);
        }
    }

    /// Update progress of an in-progress step. Ignored in any other state.
    pub fn update_progress(&mut self, id: StepId, percent: i64, message: Option<&str>) {
        if let Some(step) = self.find_mut(id) {
            if step.status != StepStatus::InProgress {
                return;
            }
            step.progress = percent.clamp(0, 100) as u8;
            if let Some(message) = message {
                step.message = message.to_string();
            }
            step.timestamp = now();
        }
    }

    /// Mark a step as completed with full progress
    pub fn complete_step(&mut self, id: StepId, message: Option<&str>) {
        if let Some(step) = self.open_step(id) {
            step.status = StepStatus::Completed;
            step.progress = 100;
            if let Some(message) = message {
                step.message = message.to_string();
            }
            step.timestamp = now();
            debug!("Milestone {} completed", id);
        }
    }

    /// Mark a step as failed, leaving its progress untouched
    pub fn fail_step(&mut self, id: StepId, message: &str) {
        if let Some(step) = self.open_step(id) {
            step.status = StepStatus::Failed;
            step.message = message.to_string();
            step.timestamp = now();
            debug!("Milestone {} failed: {}", id, message);
        }
    }

    /// Steps whose dependencies have all completed, in topological order
    pub fn get_progress(&self) -> Vec<Milestone> {
        self.milestones
            .iter()
            .filter(|m| self.dependencies_met(m))
            .cloned()
            .collect()
    }

    /// Overall progress in 0..=100 with every step weighted equally.
    ///
    /// Only reaches 100 once every step has completed.
    pub fn get_overall_progress(&self) -> u8 {
        if self.milestones.is_empty() {
            return 0;
        }

        let sum: u32 = self
            .milestones
            .iter()
            .map(|m| match m.status {
                StepStatus::Completed => 100,
                StepStatus::InProgress => u32::from(m.progress),
                StepStatus::Pending | StepStatus::Failed => 0,
            })
            .sum();
        let overall = (f64::from(sum) / self.milestones.len() as f64).round() as u8;

        let all_completed = self
            .milestones
            .iter()
            .all(|m| m.status == StepStatus::Completed);
        if overall >= 100 && !all_completed {
            99
        } else {
            overall.min(100)
        }
    }

    /// First in-progress step, else first pending step
    pub fn get_current_step(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.status == StepStatus::InProgress)
            .or_else(|| self.milestones.iter().find(|m| m.status == StepStatus::Pending))
    }

    /// Every step has completed or failed
    pub fn is_complete(&self) -> bool {
        self.milestones.iter().all(|m| m.status.is_terminal())
    }

    /// Any step has failed
    pub fn has_failed(&self) -> bool {
        self.milestones.iter().any(|m| m.status == StepStatus::Failed)
    }

    fn dependencies_met(&self, milestone: &Milestone) -> bool {
        milestone
            .depends_on
            .iter()
            .all(|dep| self.status(*dep) == Some(StepStatus::Completed))
    }

    fn find(&self, id: StepId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    fn find_mut(&mut self, id: StepId) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == id)
    }

    /// Step that may still transition; terminal steps stay final
    fn open_step(&mut self, id: StepId) -> Option<&mut Milestone> {
        self.find_mut(id).filter(|m| !m.status.is_terminal())
    }
}
