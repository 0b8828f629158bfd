pub mod milestones;

pub use milestones::{Milestone, MilestoneTracker, StepId, StepStatus};
