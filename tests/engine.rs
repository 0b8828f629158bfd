mod common;

use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use common::{
    start_silent_server, test_config, ChatServer, MockBroker, MockFetcher, CLEAN_SOURCE, DELEGATECALL_BYTECODE,
    TEST_ADDRESS,
};
use contract_risk::api::RiskEngine;
use contract_risk::bytecode::RiskSeverity;
use contract_risk::cache::InMemoryCache;
use contract_risk::inference::{InferenceClient, InferenceSession};
use contract_risk::risk::{AuxiliaryAnalysis, Finding, FindingCategory};
use contract_risk::{RiskError, StepId, StepStatus};

fn engine(fetcher: MockFetcher) -> (RiskEngine, Arc<MockFetcher>) {
    let fetcher = Arc::new(fetcher);
    (RiskEngine::new(test_config(), fetcher.clone()), fetcher)
}

fn inference(broker: MockBroker) -> InferenceClient {
    InferenceClient::new(test_config().inference, Arc::new(broker), Arc::new(InferenceSession::new())).unwrap()
}

struct FailingAnalysis;

#[async_trait]
impl AuxiliaryAnalysis for FailingAnalysis {
    fn name(&self) -> &str {
        "deployer"
    }

    async fn analyze(&self, _address: &str, _chain_id: u64) -> anyhow::Result<Vec<Finding>> {
        Err(anyhow!("indexer offline"))
    }
}

struct InteractionFindings;

#[async_trait]
impl AuxiliaryAnalysis for InteractionFindings {
    fn name(&self) -> &str {
        "interaction"
    }

    async fn analyze(&self, _address: &str, _chain_id: u64) -> anyhow::Result<Vec<Finding>> {
        Ok(vec![Finding::new(
            "Interacts with unverified contracts",
            "Most callers are unverified contracts",
            RiskSeverity::Medium,
            FindingCategory::Interaction,
            "Review the contracts that call this one",
        )])
    }
}

#[tokio::test]
async fn test_unverified_run_falls_back_when_providers_time_out() {
    let silent = start_silent_server().await;
    let broker = MockBroker::new()
        .provider("0xa", None, &silent)
        .provider("0xb", None, &silent);
    let (engine, _) = engine(MockFetcher::unverified(DELEGATECALL_BYTECODE));
    let engine = engine.with_inference(inference(broker));

    let report = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    assert!(report.used_fallback);
    assert!(report.reason.starts_with("AI scoring unavailable"));
    assert!(report.score <= 100);
    assert!(!report.is_verified);
    assert!(report.is_upgradeable);
    assert_eq!(report.address, TEST_ADDRESS.to_lowercase());
    assert_eq!(report.milestones.len(), 7);
    assert!(report.milestones.iter().all(|m| m.status == StepStatus::Completed));

    let analysis = report.bytecode_analysis.as_ref().unwrap();
    assert!(analysis.opcode_counters.contains("DELEGATECALL"));
}

#[tokio::test]
async fn test_verified_run_uses_ai_score_as_ceiling() {
    let server = ChatServer::start(r#"{"score": 30, "reason": "owner-gated counter"}"#).await;
    let (engine, _) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));
    let engine = engine.with_inference(inference(MockBroker::new().provider("0xa", None, &server.endpoint)));

    let report = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    assert!(!report.used_fallback);
    assert_eq!(report.reason, "owner-gated counter");
    assert!(report.score <= 70);
    assert!(report.is_verified);
    assert!(!report.is_upgradeable);
    assert_eq!(report.contract_name.as_deref(), Some("Counter"));
    assert!(report.quality.is_some());
    assert!(report.bytecode_analysis.is_none());
    assert_eq!(report.milestones.len(), 6);
}

#[tokio::test]
async fn test_stalled_verification_keeps_ai_score() {
    let server = ChatServer::start(r#"{"score": 20, "reason": "attested later"}"#).await;
    let broker = MockBroker::new()
        .provider("0xtee", Some(contract_risk::inference::TEE_VERIFIABILITY), &server.endpoint)
        .stall_verification();
    let (engine, _) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));
    let engine = engine.with_inference(inference(broker));

    let report = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    assert!(!report.used_fallback);
    assert_eq!(report.reason, "attested later");
    assert!(report.score <= 80);
}

#[tokio::test]
async fn test_run_without_inference_client() {
    let (engine, _) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));

    let report = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    assert!(report.used_fallback);
    assert!(report.score >= 60);
    let ai = report.milestones.iter().find(|m| m.id == StepId::AiAnalysis).unwrap();
    assert_eq!(ai.status, StepStatus::Completed);
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let (engine, fetcher) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));

    let first = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();
    let second = engine.run_analysis(&TEST_ADDRESS.to_uppercase().replace("0X", "0x"), 1).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.score, first.score);
    assert_eq!(fetcher.source_calls(), 1);
    assert!(second.milestones.iter().all(|m| m.status == StepStatus::Completed));

    // Other chains are cached separately
    let other_chain = engine.run_analysis(TEST_ADDRESS, 137).await.unwrap();
    assert!(!other_chain.from_cache);
    assert_eq!(fetcher.source_calls(), 2);
}

#[tokio::test]
async fn test_upgradeable_contracts_get_short_ttl() {
    let cache = Arc::new(InMemoryCache::new());
    let (engine, _) = engine(MockFetcher::unverified(DELEGATECALL_BYTECODE));
    let engine = engine.with_cache(cache.clone());

    engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    let ttl = cache.time_to_live(TEST_ADDRESS, 1).await.unwrap();
    assert!(ttl <= Duration::from_secs(3600));
    assert!(ttl > Duration::from_secs(3500));
}

#[tokio::test]
async fn test_stable_contracts_get_default_ttl() {
    let cache = Arc::new(InMemoryCache::new());
    let (engine, _) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));
    let engine = engine.with_cache(cache.clone());

    engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    let ttl = cache.time_to_live(TEST_ADDRESS, 1).await.unwrap();
    assert!(ttl > Duration::from_secs(3600));
}

#[tokio::test]
async fn test_disabled_cache() {
    let (engine, fetcher) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));
    let engine = engine.without_cache();

    engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();
    let second = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    assert!(!second.from_cache);
    assert_eq!(fetcher.source_calls(), 2);
}

#[tokio::test]
async fn test_invalid_address() {
    let (engine, fetcher) = engine(MockFetcher::unverified(DELEGATECALL_BYTECODE));

    let err = engine.run_analysis("0xnot-an-address", 1).await.unwrap_err();

    assert!(matches!(err, RiskError::InvalidAddress(_)));
    assert_eq!(fetcher.source_calls(), 0);
}

#[tokio::test]
async fn test_auxiliary_failure_does_not_abort_run() {
    let (engine, _) = engine(MockFetcher::verified("Counter", CLEAN_SOURCE));
    let engine = engine
        .with_deployer_analysis(Arc::new(FailingAnalysis))
        .with_interaction_analysis(Arc::new(InteractionFindings));

    let report = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    let deployer = report
        .milestones
        .iter()
        .find(|m| m.id == StepId::DeployerAnalysis)
        .unwrap();
    assert_eq!(deployer.status, StepStatus::Failed);
    assert!(deployer.message.contains("indexer offline"));

    assert!(report
        .findings
        .iter()
        .any(|f| f.category == FindingCategory::Interaction));
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.text == "Review the contracts that call this one"));
}

#[tokio::test]
async fn test_progress_events() {
    let (engine, _) = engine(MockFetcher::unverified(DELEGATECALL_BYTECODE));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let report = engine.run_analysis_with_progress(TEST_ADDRESS, 1, tx).await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(!events.is_empty());
    let first = events.first().unwrap();
    assert_eq!(first.current.as_ref().map(|m| m.id), Some(StepId::CheckCache));

    let last = events.last().unwrap();
    assert!(last.is_complete);
    assert_eq!(last.overall, 100);
    assert!(last.current.is_none());
    assert_eq!(last.milestones.len(), report.milestones.len());

    // Everything before the final transition stays below 100
    assert!(events[..events.len() - 1].iter().all(|e| e.overall < 100));
}

#[tokio::test]
async fn test_address_without_code() {
    let (engine, _) = engine(MockFetcher::unverified("0x"));

    let report = engine.run_analysis(TEST_ADDRESS, 1).await.unwrap();

    assert!(report.used_fallback);
    let analysis = report.bytecode_analysis.as_ref().unwrap();
    assert!(!analysis.is_contract);
    let step = report
        .milestones
        .iter()
        .find(|m| m.id == StepId::BytecodeAnalysis)
        .unwrap();
    assert_eq!(step.status, StepStatus::Failed);
}
