use thiserror::Error;

use crate::inference::InferenceError;

/// Engine-level errors.
///
/// A well-formed address never produces one of these from a run: failing
/// stages degrade to the fallback score instead.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
