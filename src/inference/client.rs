// Inference client
//
// Scores a contract through the highest ranked provider that answers. Each
// candidate goes through an explicit stage machine; failures move on to the
// next candidate and are aggregated once every candidate has been tried.

use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::broker::{ComputeBroker, ServiceCandidate, ServiceMetadata};
use super::error::{AttemptError, AttemptStage, InferenceError};
use super::parse::{parse_reply, ParsedReply};
use super::prompt::{build_request, RiskFeatures};
use super::ranking::rank_candidates;
use super::session::InferenceSession;
use crate::api::types::InferenceConfig;

/// Header carrying the signature over the request body
pub const SIGNATURE_HEADER: &str = "X-Request-Signature";

/// Header carrying the signer address
pub const SIGNER_HEADER: &str = "X-Request-Signer";

const MAX_ERROR_BODY: usize = 200;

/// Attempt state; each variant carries what the next stage needs
enum Attempt {
    Init,
    LedgerCheck,
    AckCheck,
    Metadata,
    Request(ServiceMetadata),
    Verify(Completion),
    Parse(String),
}

impl Attempt {
    fn stage(&self) -> AttemptStage {
        match self {
            Self::Init => AttemptStage::Init,
            Self::LedgerCheck => AttemptStage::LedgerCheck,
            Self::AckCheck => AttemptStage::AckCheck,
            Self::Metadata => AttemptStage::Metadata,
            Self::Request(_) => AttemptStage::Request,
            Self::Verify(_) => AttemptStage::Verify,
            Self::Parse(_) => AttemptStage::Parse,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// Completion text plus the id the provider attached to it
#[derive(Debug, PartialEq, Eq)]
struct Completion {
    id: Option<String>,
    content: String,
}

/// Client for the AI risk-scoring service
pub struct InferenceClient {
    config: InferenceConfig,
    broker: Arc<dyn ComputeBroker>,
    session: Arc<InferenceSession>,
    wallet: LocalWallet,
    http: reqwest::Client,
}

impl InferenceClient {
    /// Create a client. Fails fast when the signing key is absent or invalid.
    pub fn new(
        config: InferenceConfig,
        broker: Arc<dyn ComputeBroker>,
        session: Arc<InferenceSession>,
    ) -> Result<Self, InferenceError> {
        let key = config
            .private_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(InferenceError::MissingCredential("INFERENCE_PRIVATE_KEY"))?;

        let wallet: LocalWallet = key
            .parse()
            .map_err(|e| InferenceError::InvalidCredential(format!("{}", e)))?;

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            config,
            broker,
            session,
            wallet,
            http,
        })
    }

    /// Address requests are signed with
    pub fn signer_address(&self) -> String {
        to_checksum(&self.wallet.address(), None)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Run one broker call under the request timeout
    async fn bounded<T>(
        &self,
        stage: AttemptStage,
        call: impl Future<Output = Result<T, AttemptError>>,
    ) -> Result<T, AttemptError> {
        let after = self.timeout();
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| AttemptError::BrokerTimeout { stage, after })?
    }

    /// Score a contract's risk on the 0-100 scale.
    ///
    /// An unparseable reply is not an error; it comes back as
    /// [`ParsedReply::ParseError`].
    pub async fn score_risk(&self, features: &RiskFeatures) -> Result<ParsedReply, InferenceError> {
        let candidates = self
            .broker
            .list_services()
            .await
            .map_err(InferenceError::Discovery)?;
        if candidates.is_empty() {
            return Err(InferenceError::NoProviders);
        }

        let ranked = rank_candidates(candidates, &self.config.official_providers);
        debug!("Trying {} inference providers", ranked.len());

        let mut failures = Vec::new();
        for candidate in &ranked {
            match self.attempt(candidate, features).await {
                Ok(reply) => {
                    info!("Inference provider {} answered", candidate.provider_address);
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(
                        "Inference provider {} failed at {}: {}",
                        candidate.provider_address,
                        e.stage(),
                        e
                    );
                    failures.push(e);
                }
            }
        }

        Err(InferenceError::exhausted(&failures))
    }

    async fn attempt(&self, candidate: &ServiceCandidate, features: &RiskFeatures) -> Result<ParsedReply, AttemptError> {
        let provider = candidate.provider_address.as_str();
        let verifiable = candidate.is_verifiable();
        let mut state = Attempt::Init;

        loop {
            debug!("Provider {} at stage {}", provider, state.stage());
            state = match state {
                Attempt::Init => {
                    if !verifiable || self.session.is_acknowledged(provider).await {
                        Attempt::Metadata
                    } else {
                        Attempt::LedgerCheck
                    }
                }
                Attempt::LedgerCheck => {
                    let ledger = self
                        .session
                        .ensure_ledger(self.broker.as_ref(), self.config.ledger_deposit);
                    self.bounded(AttemptStage::LedgerCheck, ledger).await?;
                    Attempt::AckCheck
                }
                Attempt::AckCheck => {
                    let ack = self.session.ensure_acknowledged(self.broker.as_ref(), provider);
                    self.bounded(AttemptStage::AckCheck, ack).await?;
                    Attempt::Metadata
                }
                Attempt::Metadata => {
                    let lookup = async {
                        self.broker
                            .get_service_metadata(provider)
                            .await
                            .map_err(AttemptError::Metadata)
                    };
                    Attempt::Request(self.bounded(AttemptStage::Metadata, lookup).await?)
                }
                Attempt::Request(metadata) => {
                    let completion = self.send(provider, &metadata, features).await?;
                    if verifiable {
                        Attempt::Verify(completion)
                    } else {
                        Attempt::Parse(completion.content)
                    }
                }
                Attempt::Verify(completion) => {
                    self.verify(provider, &completion).await;
                    Attempt::Parse(completion.content)
                }
                Attempt::Parse(content) => return Ok(parse_reply(&content)),
            };
        }
    }

    /// Sign and send the scoring request
    async fn send(
        &self,
        provider: &str,
        metadata: &ServiceMetadata,
        features: &RiskFeatures,
    ) -> Result<Completion, AttemptError> {
        let request = build_request(&metadata.model, features).map_err(|e| AttemptError::Encode(e.to_string()))?;
        let payload = serde_json::to_string(&request).map_err(|e| AttemptError::Encode(e.to_string()))?;

        let signature = self
            .wallet
            .sign_message(payload.as_bytes())
            .await
            .map_err(|e| AttemptError::Signing(e.to_string()))?;
        let header_lookup = async {
            self.broker
                .get_request_headers(provider, &payload)
                .await
                .map_err(AttemptError::Headers)
        };
        let headers = self.bounded(AttemptStage::Request, header_lookup).await?;

        let url = format!("{}/chat/completions", metadata.endpoint.trim_end_matches('/'));
        let mut builder = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, format!("0x{}", signature))
            .header(SIGNER_HEADER, self.signer_address());
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let timeout = self.timeout();
        let exchange = async {
            let response = builder.body(payload).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, exchange).await {
            Err(_) => return Err(AttemptError::Timeout(timeout)),
            Ok(Err(e)) => return Err(classify_transport_error(&e, timeout)),
            Ok(Ok(exchange)) => exchange,
        };

        if !status.is_success() {
            return Err(AttemptError::Http {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        completion_text(&body)
    }

    /// Check the reply against the provider's attestation. Never fails the
    /// attempt.
    async fn verify(&self, provider: &str, completion: &Completion) {
        let check = self
            .broker
            .verify_response(provider, &completion.content, completion.id.as_deref());
        match tokio::time::timeout(self.timeout(), check).await {
            Ok(Ok(true)) => debug!("Response from {} verified", provider),
            Ok(Ok(false)) => warn!("Response from {} failed verification", provider),
            Ok(Err(e)) => warn!("Could not verify response from {}: {}", provider, e),
            Err(_) => warn!(
                "Verification of response from {} timed out after {:?}",
                provider,
                self.timeout()
            ),
        }
    }
}

fn completion_text(body: &str) -> Result<Completion, AttemptError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| AttemptError::Response(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| AttemptError::Response("no choices in completion".to_string()))?;
    Ok(Completion {
        id: response.id,
        content,
    })
}

/// Map a transport failure onto timeout, unreachable host or refused
/// connection
fn classify_transport_error(error: &reqwest::Error, timeout: Duration) -> AttemptError {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }

    if error.is_timeout() {
        return AttemptError::Timeout(timeout);
    }

    let lowered = chain.to_lowercase();
    let unreachable = ["dns error", "failed to lookup", "no route to host", "network is unreachable", "host is unreachable"];
    if unreachable.iter().any(|marker| lowered.contains(marker)) {
        AttemptError::Unreachable(chain)
    } else {
        AttemptError::Connection(chain)
    }
}
