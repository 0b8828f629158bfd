// Contract Risk API Module
//
// This module provides the main entry point for analyzing deployed contracts.
// A run checks the cache, fetches verified source or bytecode, scores the
// contract with the AI service (or the local fallback) while the auxiliary
// analyses run, and aggregates everything into one report.

pub mod config;
pub mod report;
pub mod types;

pub use config::{ConfigBuilder, ConfigManager};
pub use report::{ReportFormat, ReportFormatter};
pub use types::{CacheConfig, EngineConfig, InferenceConfig, ProgressEvent, RiskReport};

use chrono::Utc;
use ethers::types::Address;
use log::{debug, info, warn};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};

use crate::bytecode::{
    is_upgradeable_from_source, BytecodeAnalysisResult, BytecodeAnalyzer, FunctionSelector, OpcodeCounters,
    RiskSeverity,
};
use crate::cache::{CacheStore, InMemoryCache};
use crate::error::RiskError;
use crate::ethereum::{ChainFetcher, ContractFetcher, VerifiedSource};
use crate::inference::{
    fallback_score, FallbackInput, FallbackScore, InferenceClient, InferenceSession, ParsedReply, RiskFeatures,
    StaticBroker,
};
use crate::pipeline::{Milestone, MilestoneTracker, StepId};
use crate::risk::{
    aggregate, categorize_recommendations, overall_severity, scan_source, AuxiliaryAnalysis, Finding, NoopAnalysis,
    QualityScores, ScoreSource,
};

impl From<&MilestoneTracker> for ProgressEvent {
    fn from(tracker: &MilestoneTracker) -> Self {
        Self {
            overall: tracker.get_overall_progress(),
            current: tracker.get_current_step().cloned(),
            milestones: tracker.get_progress(),
            is_complete: tracker.is_complete(),
        }
    }
}

/// Milestone tracker of one run plus its optional progress stream
struct RunProgress {
    tracker: Arc<Mutex<MilestoneTracker>>,
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl RunProgress {
    fn new(is_verified: bool, sender: Option<UnboundedSender<ProgressEvent>>) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(MilestoneTracker::new(is_verified))),
            sender,
        }
    }

    fn emit(&self, tracker: &MilestoneTracker) {
        if let Some(sender) = &self.sender {
            if sender.send(ProgressEvent::from(tracker)).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    async fn start(&self, id: StepId) {
        let mut tracker = self.tracker.lock().await;
        tracker.start_step(id);
        self.emit(&tracker);
    }

    async fn update(&self, id: StepId, percent: i64, message: &str) {
        let mut tracker = self.tracker.lock().await;
        tracker.update_progress(id, percent, Some(message));
        self.emit(&tracker);
    }

    async fn complete(&self, id: StepId, message: &str) {
        let mut tracker = self.tracker.lock().await;
        tracker.complete_step(id, Some(message));
        self.emit(&tracker);
    }

    async fn fail(&self, id: StepId, message: &str) {
        let mut tracker = self.tracker.lock().await;
        tracker.fail_step(id, message);
        self.emit(&tracker);
    }

    async fn snapshot(&self) -> Vec<Milestone> {
        self.tracker.lock().await.milestones().to_vec()
    }
}

/// What the fetch stage learned about the contract
struct Subject {
    source: Option<VerifiedSource>,
    bytecode_analysis: Option<BytecodeAnalysisResult>,
    findings: Vec<Finding>,
    quality: Option<QualityScores>,
    is_upgradeable: bool,
    features: RiskFeatures,
}

/// Main interface for contract risk analysis
pub struct RiskEngine {
    config: EngineConfig,
    analyzer: BytecodeAnalyzer,
    fetcher: Arc<dyn ContractFetcher>,
    cache: Option<Arc<dyn CacheStore>>,
    inference: Option<Arc<InferenceClient>>,
    deployer: Arc<dyn AuxiliaryAnalysis>,
    interaction: Arc<dyn AuxiliaryAnalysis>,
}

impl RiskEngine {
    /// Create an engine without AI scoring; every run uses the local
    /// fallback until [`RiskEngine::with_inference`] is called
    pub fn new(config: EngineConfig, fetcher: Arc<dyn ContractFetcher>) -> Self {
        let cache: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            Some(Arc::new(InMemoryCache::new()))
        } else {
            None
        };

        Self {
            analyzer: BytecodeAnalyzer::with_scan_mode(config.scan_mode),
            config,
            fetcher,
            cache,
            inference: None,
            deployer: Arc::new(NoopAnalysis::new("deployer")),
            interaction: Arc::new(NoopAnalysis::new("interaction")),
        }
    }

    /// Create an engine with the default chain fetcher and, when an endpoint
    /// is configured, a static-endpoint inference client
    pub fn from_config(config: EngineConfig) -> Result<Self, RiskError> {
        let fetcher = Arc::new(ChainFetcher::from_config(&config));
        let mut engine = Self::new(config, fetcher);

        let inference = engine.config.inference.clone();
        match inference.endpoint.clone() {
            Some(endpoint) => {
                let broker = Arc::new(StaticBroker::new(endpoint, inference.model.clone(), inference.api_key.clone()));
                let client = InferenceClient::new(inference, broker, InferenceSession::global())?;
                engine.inference = Some(Arc::new(client));
            }
            None => warn!("No inference endpoint configured; scores will come from the local heuristic"),
        }

        Ok(engine)
    }

    /// Use a specific cache store
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disable caching
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Score contracts through this inference client
    pub fn with_inference(mut self, client: InferenceClient) -> Self {
        self.inference = Some(Arc::new(client));
        self
    }

    pub fn with_deployer_analysis(mut self, analysis: Arc<dyn AuxiliaryAnalysis>) -> Self {
        self.deployer = analysis;
        self
    }

    pub fn with_interaction_analysis(mut self, analysis: Arc<dyn AuxiliaryAnalysis>) -> Self {
        self.interaction = analysis;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze bytecode with the configured scan mode
    pub fn analyze(&self, address: &str, bytecode_hex: &str) -> BytecodeAnalysisResult {
        self.analyzer.analyze(address, bytecode_hex)
    }

    pub fn is_upgradeable(&self, bytecode_hex: &str, selectors: &[FunctionSelector]) -> bool {
        self.analyzer.is_upgradeable(bytecode_hex, selectors)
    }

    /// Analyze a deployed contract
    pub async fn run_analysis(&self, address: &str, chain_id: u64) -> Result<RiskReport, RiskError> {
        self.run(address, chain_id, None).await
    }

    /// Analyze a deployed contract, sending a progress snapshot after every
    /// milestone transition
    pub async fn run_analysis_with_progress(
        &self,
        address: &str,
        chain_id: u64,
        progress: UnboundedSender<ProgressEvent>,
    ) -> Result<RiskReport, RiskError> {
        self.run(address, chain_id, Some(progress)).await
    }

    async fn run(
        &self,
        address: &str,
        chain_id: u64,
        sender: Option<UnboundedSender<ProgressEvent>>,
    ) -> Result<RiskReport, RiskError> {
        let address = normalize_address(address)?;
        let deadline = Instant::now() + self.config.run_deadline();
        info!("Analyzing {} on chain {}", address, chain_id);

        let cache_message = match self.cached_report(&address, chain_id, deadline).await {
            CacheLookup::Hit(report) => return Ok(self.serve_cached(report, sender).await),
            CacheLookup::Miss => "Cache miss",
            CacheLookup::Disabled => "Cache disabled",
            CacheLookup::Failed => "Cache unavailable",
        };

        // Verification status decides the pipeline topology
        let source = match timeout_at(deadline, self.fetcher.fetch_verified_source(&address, chain_id)).await {
            Ok(Ok(source)) => source,
            Ok(Err(e)) => {
                warn!("Verified source lookup for {} failed: {}", address, e);
                None
            }
            Err(_) => {
                warn!("Verified source lookup for {} hit the run deadline", address);
                None
            }
        };

        let progress = RunProgress::new(source.is_some(), sender);
        progress.start(StepId::CheckCache).await;
        progress.complete(StepId::CheckCache, cache_message).await;

        let subject = match source {
            Some(source) => self.prepare_verified(&progress, &address, chain_id, source).await,
            None => self.prepare_unverified(&progress, &address, chain_id, deadline).await,
        };

        let empty_census = OpcodeCounters::default();
        let fallback_input = match (&subject.source, &subject.bytecode_analysis) {
            (Some(source), _) => FallbackInput::Source(&source.code),
            (None, Some(analysis)) => FallbackInput::Bytecode(&analysis.opcode_counters),
            (None, None) => FallbackInput::Bytecode(&empty_census),
        };

        let (score_source, deployer_findings, interaction_findings) = futures::join!(
            self.ai_stage(&progress, &subject.features, fallback_input, deadline),
            self.auxiliary_stage(&progress, StepId::DeployerAnalysis, self.deployer.as_ref(), &address, chain_id, deadline),
            self.auxiliary_stage(&progress, StepId::InteractionAnalysis, self.interaction.as_ref(), &address, chain_id, deadline),
        );

        progress.start(StepId::RiskCalculation).await;
        let mut findings = subject.findings;
        findings.extend(deployer_findings);
        findings.extend(interaction_findings);

        let bytecode_risk = subject.bytecode_analysis.as_ref().map(|a| &a.risk_assessment);
        let quality = subject.quality.as_ref();
        let score = aggregate(&score_source, bytecode_risk, &findings, quality);
        let severity = overall_severity(score, bytecode_risk);
        let recommendations = categorize_recommendations(&findings, bytecode_risk, quality);
        progress
            .complete(StepId::RiskCalculation, &format!("Safety score {} ({})", score, severity))
            .await;

        let report = RiskReport {
            address: address.clone(),
            chain_id,
            score,
            severity,
            findings,
            recommendations,
            milestones: progress.snapshot().await,
            is_verified: subject.source.is_some(),
            contract_name: subject.features.contract_name.clone(),
            is_upgradeable: subject.is_upgradeable,
            reason: score_source.reason().to_string(),
            used_fallback: score_source.is_fallback(),
            quality: subject.quality,
            bytecode_analysis: subject.bytecode_analysis,
            timestamp: Utc::now().to_rfc3339(),
            from_cache: false,
        };

        if let Some(cache) = &self.cache {
            let ttl = self.config.cache.ttl(report.is_upgradeable);
            match cache.put(&address, chain_id, &report, ttl).await {
                Ok(()) => debug!("Cached report for {} for {:?}", address, ttl),
                Err(e) => warn!("Failed to cache report for {}: {}", address, e),
            }
        }

        info!("Analysis of {} finished with score {} ({})", address, report.score, report.severity);
        Ok(report)
    }

    async fn cached_report(&self, address: &str, chain_id: u64, deadline: Instant) -> CacheLookup {
        let Some(cache) = &self.cache else {
            return CacheLookup::Disabled;
        };

        match cache.invalidate_expired().await {
            Ok(0) => {}
            Ok(removed) => debug!("Dropped {} expired cache entries", removed),
            Err(e) => warn!("Cache cleanup failed: {}", e),
        }

        match timeout_at(deadline, cache.get(address, chain_id)).await {
            Ok(Ok(Some(report))) => {
                info!("Serving {} on chain {} from cache", address, chain_id);
                CacheLookup::Hit(Box::new(report))
            }
            Ok(Ok(None)) => CacheLookup::Miss,
            Ok(Err(e)) => {
                warn!("Cache lookup failed: {}", e);
                CacheLookup::Failed
            }
            Err(_) => {
                warn!("Cache lookup hit the run deadline");
                CacheLookup::Failed
            }
        }
    }

    async fn serve_cached(&self, report: Box<RiskReport>, sender: Option<UnboundedSender<ProgressEvent>>) -> RiskReport {
        let mut report = *report;
        let progress = RunProgress::new(report.is_verified, sender);

        progress.start(StepId::CheckCache).await;
        progress.complete(StepId::CheckCache, "Cache hit").await;
        let remaining: Vec<StepId> = progress
            .snapshot()
            .await
            .iter()
            .map(|m| m.id)
            .filter(|id| *id != StepId::CheckCache)
            .collect();
        for id in remaining {
            progress.complete(id, "Served from cache").await;
        }

        report.milestones = progress.snapshot().await;
        report.from_cache = true;
        report
    }

    async fn prepare_verified(
        &self,
        progress: &RunProgress,
        address: &str,
        chain_id: u64,
        source: VerifiedSource,
    ) -> Subject {
        progress.start(StepId::FetchSource).await;
        let name = if source.contract_name.is_empty() {
            None
        } else {
            Some(source.contract_name.clone())
        };
        progress
            .complete(
                StepId::FetchSource,
                &format!("Fetched verified source ({})", name.as_deref().unwrap_or("unnamed")),
            )
            .await;

        let scan = scan_source(&source.code);
        let is_upgradeable = is_upgradeable_from_source(&source.code);
        let features = RiskFeatures {
            address: address.to_string(),
            chain_id,
            is_verified: true,
            contract_name: name,
            contract_type: None,
            is_upgradeable,
            heuristic_severity: highest_severity(&scan.findings),
            heuristic_findings: scan.findings.iter().map(|f| f.title.clone()).collect(),
            opcode_counters: OpcodeCounters::default(),
            functions: Vec::new(),
            source: Some(source.code.clone()),
        };

        Subject {
            source: Some(source),
            bytecode_analysis: None,
            findings: scan.findings,
            quality: Some(scan.quality),
            is_upgradeable,
            features,
        }
    }

    async fn prepare_unverified(
        &self,
        progress: &RunProgress,
        address: &str,
        chain_id: u64,
        deadline: Instant,
    ) -> Subject {
        progress.start(StepId::FetchBytecode).await;
        let bytecode = match timeout_at(deadline, self.fetcher.fetch_bytecode(address, chain_id)).await {
            Ok(Ok(bytecode)) => {
                progress
                    .complete(StepId::FetchBytecode, &format!("Fetched {} bytes of bytecode", hex_len(&bytecode)))
                    .await;
                bytecode
            }
            Ok(Err(e)) => {
                progress
                    .fail(StepId::FetchBytecode, &format!("Bytecode fetch failed: {}", e))
                    .await;
                String::new()
            }
            Err(_) => {
                progress.fail(StepId::FetchBytecode, "Bytecode fetch hit the run deadline").await;
                String::new()
            }
        };

        progress.start(StepId::BytecodeAnalysis).await;
        let analysis = self.analyzer.analyze(address, &bytecode);
        progress.update(StepId::BytecodeAnalysis, 50, "Scanned opcodes and selectors").await;
        if analysis.is_contract {
            progress
                .complete(
                    StepId::BytecodeAnalysis,
                    &format!(
                        "{} recognised functions, {} risks",
                        analysis.function_selectors.len(),
                        analysis.risk_assessment.risks.len()
                    ),
                )
                .await;
        } else {
            progress.fail(StepId::BytecodeAnalysis, "No contract code at address").await;
        }

        let is_upgradeable = self.analyzer.is_upgradeable(&bytecode, &analysis.function_selectors);
        let features = RiskFeatures {
            address: address.to_string(),
            chain_id,
            is_verified: false,
            contract_name: None,
            contract_type: Some(analysis.contract_type),
            is_upgradeable,
            heuristic_severity: analysis.risk_assessment.severity,
            heuristic_findings: analysis.risk_assessment.risks.clone(),
            opcode_counters: analysis.opcode_counters.clone(),
            functions: analysis.function_selectors.iter().map(|s| s.signature.clone()).collect(),
            source: None,
        };

        Subject {
            source: None,
            bytecode_analysis: Some(analysis),
            findings: Vec::new(),
            quality: None,
            is_upgradeable,
            features,
        }
    }

    async fn ai_stage(
        &self,
        progress: &RunProgress,
        features: &RiskFeatures,
        fallback: FallbackInput<'_>,
        deadline: Instant,
    ) -> ScoreSource {
        progress.start(StepId::AiAnalysis).await;

        let outcome = match &self.inference {
            None => Err("no inference client configured".to_string()),
            Some(client) => match timeout_at(deadline, client.score_risk(features)).await {
                Ok(Ok(ParsedReply::Score(score))) => Ok(score),
                Ok(Ok(ParsedReply::ParseError { raw })) => {
                    debug!("Unparseable model reply: {}", raw);
                    Err("model reply could not be parsed".to_string())
                }
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err("run deadline reached".to_string()),
            },
        };

        match outcome {
            Ok(score) => {
                progress
                    .complete(StepId::AiAnalysis, &format!("AI risk score {}", score.score))
                    .await;
                ScoreSource::Inference(score)
            }
            Err(cause) => {
                warn!("AI scoring unavailable for {}: {}", features.address, cause);
                let fallback = fallback_score(fallback, features.is_verified);
                progress
                    .complete(StepId::AiAnalysis, "AI unavailable, used local heuristic")
                    .await;
                ScoreSource::Fallback(FallbackScore {
                    reason: format!("{}; {}", fallback.reason, cause),
                    score: fallback.score,
                })
            }
        }
    }

    async fn auxiliary_stage(
        &self,
        progress: &RunProgress,
        step: StepId,
        analysis: &dyn AuxiliaryAnalysis,
        address: &str,
        chain_id: u64,
        deadline: Instant,
    ) -> Vec<Finding> {
        progress.start(step).await;
        match timeout_at(deadline, analysis.analyze(address, chain_id)).await {
            Ok(Ok(findings)) => {
                progress
                    .complete(step, &format!("{} analysis: {} findings", analysis.name(), findings.len()))
                    .await;
                findings
            }
            Ok(Err(e)) => {
                warn!("{} analysis for {} failed: {}", analysis.name(), address, e);
                progress
                    .fail(step, &format!("{} analysis failed: {}", analysis.name(), e))
                    .await;
                Vec::new()
            }
            Err(_) => {
                progress
                    .fail(step, &format!("{} analysis hit the run deadline", analysis.name()))
                    .await;
                Vec::new()
            }
        }
    }
}

enum CacheLookup {
    Hit(Box<RiskReport>),
    Miss,
    Disabled,
    Failed,
}

/// Validate an address and return it as lowercase `0x`-prefixed hex
pub fn normalize_address(address: &str) -> Result<String, RiskError> {
    let trimmed = address.trim();
    if trimmed.len() != 42 || !(trimmed.starts_with("0x") || trimmed.starts_with("0X")) {
        return Err(RiskError::InvalidAddress(address.to_string()));
    }
    let parsed = Address::from_str(&trimmed[2..]).map_err(|_| RiskError::InvalidAddress(address.to_string()))?;
    Ok(format!("0x{}", hex::encode(parsed.as_bytes())))
}

fn highest_severity(findings: &[Finding]) -> RiskSeverity {
    findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or_default()
}

fn hex_len(bytecode: &str) -> usize {
    let digits = bytecode.trim().trim_start_matches("0x").len();
    digits / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address(" 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 ").unwrap(),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        assert!(matches!(normalize_address("0x1234"), Err(RiskError::InvalidAddress(_))));
        assert!(matches!(
            normalize_address("0xZZb86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            Err(RiskError::InvalidAddress(_))
        ));
        assert!(normalize_address("a0b86991c6218b36c1d19D4a2e9Eb0cE3606eB4800").is_err());
    }

    #[test]
    fn test_progress_event_from_tracker() {
        let mut tracker = MilestoneTracker::new(false);
        tracker.complete_step(StepId::CheckCache, None);

        let event = ProgressEvent::from(&tracker);
        assert_eq!(event.overall, 14);
        assert_eq!(event.current.map(|m| m.id), Some(StepId::FetchBytecode));
        assert_eq!(event.milestones.len(), 2);
        assert!(!event.is_complete);
    }

    #[test]
    fn test_highest_severity() {
        assert_eq!(highest_severity(&[]), RiskSeverity::Low);
        let findings = vec![
            Finding::new("a", "", RiskSeverity::Medium, crate::risk::FindingCategory::Timing, ""),
            Finding::new("b", "", RiskSeverity::High, crate::risk::FindingCategory::Timing, ""),
        ];
        assert_eq!(highest_severity(&findings), RiskSeverity::High);
    }
}
