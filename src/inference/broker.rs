// Compute broker interface
//
// The broker fronts a compute-market network: it lists inference providers,
// hands out per-provider metadata and billing headers, manages the prepaid
// ledger and verifies responses from providers that run in verifiable
// execution environments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors reported by a compute broker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("ledger already exists")]
    LedgerExists,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("broker request failed: {0}")]
    Request(String),
}

/// Inference provider advertised by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCandidate {
    pub provider_address: String,
    /// Verifiable execution mode, e.g. `TeeML`
    pub verifiability: Option<String>,
}

impl ServiceCandidate {
    pub fn new(provider_address: impl Into<String>, verifiability: Option<&str>) -> Self {
        Self {
            provider_address: provider_address.into(),
            verifiability: verifiability.map(str::to_string),
        }
    }

    /// Whether the provider advertises any verifiable execution mode
    pub fn is_verifiable(&self) -> bool {
        self.verifiability
            .as_deref()
            .map_or(false, |mode| !mode.trim().is_empty())
    }
}

/// Where and how to reach a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
}

/// Compute-market broker
#[async_trait]
pub trait ComputeBroker: Send + Sync {
    /// Providers currently offering inference
    async fn list_services(&self) -> Result<Vec<ServiceCandidate>, BrokerError>;

    async fn get_service_metadata(&self, provider: &str) -> Result<ServiceMetadata, BrokerError>;

    /// Register the caller with a provider before first use
    async fn acknowledge_provider(&self, provider: &str) -> Result<(), BrokerError>;

    /// Billing headers for one request carrying `payload`
    async fn get_request_headers(
        &self,
        provider: &str,
        payload: &str,
    ) -> Result<HashMap<String, String>, BrokerError>;

    /// Check a raw response against the provider's attestation. `id` is the
    /// completion id when the provider returned one.
    async fn verify_response(&self, provider: &str, response: &str, id: Option<&str>) -> Result<bool, BrokerError>;

    /// Create the prepaid ledger. Fails with [`BrokerError::LedgerExists`]
    /// when one is already present.
    async fn create_ledger(&self, amount: f64) -> Result<(), BrokerError>;

    async fn deposit_funds(&self, amount: f64) -> Result<(), BrokerError>;
}

/// Provider address reported by [`StaticBroker`]
pub const STATIC_PROVIDER: &str = "static";

/// Broker for a single OpenAI-compatible endpoint without a ledger.
///
/// Lists one unverifiable provider, so the client goes straight from
/// metadata to the request.
#[derive(Debug, Clone)]
pub struct StaticBroker {
    metadata: ServiceMetadata,
    api_key: Option<String>,
}

impl StaticBroker {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            metadata: ServiceMetadata {
                endpoint: endpoint.into(),
                model: model.into(),
            },
            api_key,
        }
    }
}

#[async_trait]
impl ComputeBroker for StaticBroker {
    async fn list_services(&self) -> Result<Vec<ServiceCandidate>, BrokerError> {
        Ok(vec![ServiceCandidate::new(STATIC_PROVIDER, None)])
    }

    async fn get_service_metadata(&self, provider: &str) -> Result<ServiceMetadata, BrokerError> {
        if provider == STATIC_PROVIDER {
            Ok(self.metadata.clone())
        } else {
            Err(BrokerError::Unavailable(format!("unknown provider {}", provider)))
        }
    }

    async fn acknowledge_provider(&self, _provider: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn get_request_headers(
        &self,
        _provider: &str,
        _payload: &str,
    ) -> Result<HashMap<String, String>, BrokerError> {
        let mut headers = HashMap::new();
        if let Some(key) = &self.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {}", key));
        }
        Ok(headers)
    }

    async fn verify_response(&self, _provider: &str, _response: &str, _id: Option<&str>) -> Result<bool, BrokerError> {
        Ok(true)
    }

    async fn create_ledger(&self, _amount: f64) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn deposit_funds(&self, _amount: f64) -> Result<(), BrokerError> {
        Ok(())
    }
}
