use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::broker::BrokerError;

/// Stage of a single candidate attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Init,
    LedgerCheck,
    AckCheck,
    Metadata,
    Request,
    Verify,
    Parse,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::LedgerCheck => "ledger-check",
            Self::AckCheck => "ack-check",
            Self::Metadata => "metadata",
            Self::Request => "request",
            Self::Verify => "verify",
            Self::Parse => "parse",
        };
        f.write_str(name)
    }
}

/// Typed failure of one candidate attempt
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("ledger setup failed: {0}")]
    Ledger(#[source] BrokerError),

    #[error("provider acknowledgement failed: {0}")]
    Acknowledge(#[source] BrokerError),

    #[error("service metadata unavailable: {0}")]
    Metadata(#[source] BrokerError),

    #[error("request headers unavailable: {0}")]
    Headers(#[source] BrokerError),

    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("broker call at {stage} timed out after {after:?}")]
    BrokerTimeout { stage: AttemptStage, after: Duration },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Response(String),
}

impl AttemptError {
    /// Stage at which the attempt stopped
    pub fn stage(&self) -> AttemptStage {
        match self {
            Self::Ledger(_) => AttemptStage::LedgerCheck,
            Self::Acknowledge(_) => AttemptStage::AckCheck,
            Self::Metadata(_) => AttemptStage::Metadata,
            Self::BrokerTimeout { stage, .. } => *stage,
            Self::Headers(_)
            | Self::Encode(_)
            | Self::Signing(_)
            | Self::Timeout(_)
            | Self::Connection(_)
            | Self::Unreachable(_)
            | Self::Http { .. }
            | Self::Response(_) => AttemptStage::Request,
        }
    }
}

/// Dominant cause when every candidate failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionCause {
    ConnectionFailed,
    Timeout,
    Unreachable,
    /// No network failure; providers were unavailable or answered badly
    ProviderErrors,
}

impl ExhaustionCause {
    /// Classify a set of attempt failures.
    ///
    /// Unreachable hosts win over refused connections, which win over
    /// timeouts.
    pub fn classify(failures: &[AttemptError]) -> Self {
        let any = |pred: fn(&AttemptError) -> bool| failures.iter().any(pred);

        if any(|e| matches!(e, AttemptError::Unreachable(_))) {
            Self::Unreachable
        } else if any(|e| matches!(e, AttemptError::Connection(_))) {
            Self::ConnectionFailed
        } else if any(|e| matches!(e, AttemptError::Timeout(_) | AttemptError::BrokerTimeout { .. })) {
            Self::Timeout
        } else {
            Self::ProviderErrors
        }
    }
}

impl fmt::Display for ExhaustionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConnectionFailed => "connection failed",
            Self::Timeout => "timed out",
            Self::Unreachable => "host unreachable",
            Self::ProviderErrors => "providers unavailable",
        };
        f.write_str(text)
    }
}

/// Inference client errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid signing key: {0}")]
    InvalidCredential(String),

    #[error("no inference providers available")]
    NoProviders,

    #[error("provider discovery failed: {0}")]
    Discovery(#[source] BrokerError),

    #[error("all {attempts} inference providers failed ({cause}): {details}")]
    Exhausted {
        attempts: usize,
        cause: ExhaustionCause,
        details: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl InferenceError {
    /// Aggregate the failures of every attempted candidate
    pub fn exhausted(failures: &[AttemptError]) -> Self {
        let details = failures
            .iter()
            .map(|failure| format!("[{}] {}", failure.stage(), failure))
            .collect::<Vec<_>>()
            .join("; ");

        Self::Exhausted {
            attempts: failures.len(),
            cause: ExhaustionCause::classify(failures),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefers_unreachable() {
        let failures = vec![
            AttemptError::Timeout(Duration::from_secs(1)),
            AttemptError::Connection("refused".into()),
            AttemptError::Unreachable("no route".into()),
        ];
        assert_eq!(ExhaustionCause::classify(&failures), ExhaustionCause::Unreachable);
    }

    #[test]
    fn test_classify_timeouts_only() {
        let failures = vec![
            AttemptError::Timeout(Duration::from_secs(1)),
            AttemptError::Metadata(BrokerError::Unavailable("gone".into())),
        ];
        assert_eq!(ExhaustionCause::classify(&failures), ExhaustionCause::Timeout);
    }

    #[test]
    fn test_broker_timeout_keeps_its_stage() {
        let stalled = AttemptError::BrokerTimeout {
            stage: AttemptStage::Metadata,
            after: Duration::from_secs(1),
        };
        assert_eq!(stalled.stage(), AttemptStage::Metadata);
        assert_eq!(stalled.to_string(), "broker call at metadata timed out after 1s");
        assert_eq!(ExhaustionCause::classify(&[stalled]), ExhaustionCause::Timeout);
    }

    #[test]
    fn test_classify_without_network_failures() {
        let failures = vec![AttemptError::Metadata(BrokerError::Unavailable("gone".into()))];
        assert_eq!(ExhaustionCause::classify(&failures), ExhaustionCause::ProviderErrors);
    }

    #[test]
    fn test_exhausted_message() {
        let failures = vec![
            AttemptError::Metadata(BrokerError::Unavailable("gone".into())),
            AttemptError::Connection("refused".into()),
        ];
        let err = InferenceError::exhausted(&failures);
        let message = err.to_string();

        assert!(message.starts_with("all 2 inference providers failed (connection failed)"));
        assert!(message.contains("[metadata] service metadata unavailable"));
        assert!(message.contains("[request] connection failed: refused"));
    }
}
