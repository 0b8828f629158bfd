// Inference session
//
// Process-wide billing state: whether the prepaid ledger is ready and which
// providers have been acknowledged. The lock is held across ledger creation
// so concurrent first use creates the ledger exactly once.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use super::broker::{BrokerError, ComputeBroker};
use super::error::AttemptError;

#[derive(Debug, Default)]
struct SessionState {
    ledger_ready: bool,
    acknowledged: HashSet<String>,
}

/// Shared ledger and acknowledgement state
#[derive(Debug, Default)]
pub struct InferenceSession {
    state: Mutex<SessionState>,
}

static GLOBAL_SESSION: OnceLock<Arc<InferenceSession>> = OnceLock::new();

impl InferenceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session shared by every client in the process
    pub fn global() -> Arc<InferenceSession> {
        GLOBAL_SESSION
            .get_or_init(|| Arc::new(InferenceSession::new()))
            .clone()
    }

    pub async fn is_ledger_ready(&self) -> bool {
        self.state.lock().await.ledger_ready
    }

    pub async fn is_acknowledged(&self, provider: &str) -> bool {
        self.state.lock().await.acknowledged.contains(provider)
    }

    /// Create and fund the ledger once per process.
    ///
    /// An existing ledger and a failed deposit for lack of funds are both
    /// accepted.
    pub async fn ensure_ledger(&self, broker: &dyn ComputeBroker, amount: f64) -> Result<(), AttemptError> {
        let mut state = self.state.lock().await;
        if state.ledger_ready {
            return Ok(());
        }

        match broker.create_ledger(amount).await {
            Ok(()) => info!("Created inference ledger with {} funds", amount),
            Err(BrokerError::LedgerExists) => debug!("Inference ledger already exists"),
            Err(e) => return Err(AttemptError::Ledger(e)),
        }

        match broker.deposit_funds(amount).await {
            Ok(()) => debug!("Deposited {} into inference ledger", amount),
            Err(BrokerError::InsufficientFunds(reason)) => {
                warn!("Skipping ledger deposit: insufficient funds ({})", reason)
            }
            Err(e) => return Err(AttemptError::Ledger(e)),
        }

        state.ledger_ready = true;
        Ok(())
    }

    /// Acknowledge a provider once per process. Returns `false` when it was
    /// already acknowledged.
    pub async fn ensure_acknowledged(
        &self,
        broker: &dyn ComputeBroker,
        provider: &str,
    ) -> Result<bool, AttemptError> {
        let mut state = self.state.lock().await;
        if state.acknowledged.contains(provider) {
            return Ok(false);
        }

        broker
            .acknowledge_provider(provider)
            .await
            .map_err(AttemptError::Acknowledge)?;
        state.acknowledged.insert(provider.to_string());
        debug!("Acknowledged inference provider {}", provider);
        Ok(true)
    }

    /// Forget all session state
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.ledger_ready = false;
        state.acknowledged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::broker::{ServiceCandidate, ServiceMetadata};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingBroker {
        ledgers: AtomicUsize,
        deposits: AtomicUsize,
        acks: AtomicUsize,
        ledger_exists: bool,
        broke: bool,
    }

    #[async_trait]
    impl ComputeBroker for CountingBroker {
        async fn list_services(&self) -> Result<Vec<ServiceCandidate>, BrokerError> {
            Ok(Vec::new())
        }

        async fn get_service_metadata(&self, _provider: &str) -> Result<ServiceMetadata, BrokerError> {
            Err(BrokerError::Unavailable("unused".into()))
        }

        async fn acknowledge_provider(&self, _provider: &str) -> Result<(), BrokerError> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_request_headers(
            &self,
            _provider: &str,
            _payload: &str,
        ) -> Result<HashMap<String, String>, BrokerError> {
            Ok(HashMap::new())
        }

        async fn verify_response(
            &self,
            _provider: &str,
            _response: &str,
            _id: Option<&str>,
        ) -> Result<bool, BrokerError> {
            Ok(true)
        }

        async fn create_ledger(&self, _amount: f64) -> Result<(), BrokerError> {
            // Widen the race window for concurrent callers
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.ledgers.fetch_add(1, Ordering::SeqCst);
            if self.ledger_exists {
                Err(BrokerError::LedgerExists)
            } else {
                Ok(())
            }
        }

        async fn deposit_funds(&self, _amount: f64) -> Result<(), BrokerError> {
            self.deposits.fetch_add(1, Ordering::SeqCst);
            if self.broke {
                Err(BrokerError::InsufficientFunds("balance 0".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_init_creates_ledger_once() {
        let session = Arc::new(InferenceSession::new());
        let broker = Arc::new(CountingBroker::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                session.ensure_ledger(broker.as_ref(), 0.1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(broker.ledgers.load(Ordering::SeqCst), 1);
        assert_eq!(broker.deposits.load(Ordering::SeqCst), 1);
        assert!(session.is_ledger_ready().await);
    }

    #[tokio::test]
    async fn test_existing_ledger_and_insufficient_funds_tolerated() {
        let session = InferenceSession::new();
        let broker = CountingBroker {
            ledger_exists: true,
            broke: true,
            ..Default::default()
        };

        session.ensure_ledger(&broker, 0.1).await.unwrap();
        assert!(session.is_ledger_ready().await);
    }

    #[tokio::test]
    async fn test_acknowledge_once_and_reset() {
        let session = InferenceSession::new();
        let broker = CountingBroker::default();

        assert!(session.ensure_acknowledged(&broker, "0xprovider").await.unwrap());
        assert!(!session.ensure_acknowledged(&broker, "0xprovider").await.unwrap());
        assert!(session.is_acknowledged("0xprovider").await);
        assert_eq!(broker.acks.load(Ordering::SeqCst), 1);

        session.reset().await;
        assert!(!session.is_acknowledged("0xprovider").await);
        assert!(!session.is_ledger_ready().await);
    }

    #[test]
    fn test_global_session_is_shared() {
        assert!(Arc::ptr_eq(&InferenceSession::global(), &InferenceSession::global()));
    }
}
