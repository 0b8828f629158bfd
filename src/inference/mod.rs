// AI Inference Module
//
// This module talks to the compute-market inference service: provider
// discovery and ranking, the process-wide billing session, request signing,
// tolerant reply parsing and the local fallback used when no provider answers.

pub mod broker;
pub mod client;
pub mod error;
pub mod fallback;
pub mod parse;
pub mod prompt;
pub mod ranking;
pub mod session;

pub use broker::{BrokerError, ComputeBroker, ServiceCandidate, ServiceMetadata, StaticBroker};
pub use client::InferenceClient;
pub use error::{AttemptError, AttemptStage, ExhaustionCause, InferenceError};
pub use fallback::{fallback_score, FallbackInput, FallbackScore};
pub use parse::{parse_reply, ParseStrategy, ParsedReply, RiskScore};
pub use prompt::{DerivedFlags, RiskFeatures};
pub use ranking::{rank_candidates, OFFICIAL_PROVIDERS, TEE_VERIFIABILITY};
pub use session::InferenceSession;
