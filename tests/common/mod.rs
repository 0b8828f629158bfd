#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use contract_risk::api::{ConfigManager, EngineConfig};
use contract_risk::ethereum::{ContractFetcher, VerifiedSource};
use contract_risk::inference::{BrokerError, ComputeBroker, ServiceCandidate, ServiceMetadata};

// Well-known development key, never funded on a real chain
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const TEST_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

// PUSH1 0x00 DUP1 DELEGATECALL STOP
pub const DELEGATECALL_BYTECODE: &str = "0x600080f400";

pub const CLEAN_SOURCE: &str = r#"
pragma solidity 0.8.20;

/// @title Counter
/// @notice Counts things
contract Counter {
    address public owner;
    uint256 public count;

    event Incremented(uint256 count);

    modifier onlyOwner() {
        require(msg.sender == owner, "not owner");
        _;
    }

    constructor() {
        owner = msg.sender;
    }

    /// @notice Increase the counter by one
    function increment() external onlyOwner {
        count += 1;
        emit Incremented(count);
    }
}
"#;

/// Engine configuration for tests: short deadlines, no network defaults
pub fn test_config() -> EngineConfig {
    ConfigManager::builder()
        .private_key(TEST_PRIVATE_KEY)
        .inference_timeout_secs(1)
        .run_deadline_secs(20)
        .build()
}

/// Broker over a fixed provider list
pub struct MockBroker {
    services: Vec<ServiceCandidate>,
    endpoints: HashMap<String, String>,
    verify_result: Result<bool, BrokerError>,
    stalled_metadata: HashSet<String>,
    stalled_verification: bool,
    pub metadata_calls: Mutex<Vec<String>>,
    pub verified_ids: Mutex<Vec<Option<String>>>,
    pub acknowledged: Mutex<Vec<String>>,
    pub ledger_creations: AtomicUsize,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            endpoints: HashMap::new(),
            verify_result: Ok(true),
            stalled_metadata: HashSet::new(),
            stalled_verification: false,
            metadata_calls: Mutex::new(Vec::new()),
            verified_ids: Mutex::new(Vec::new()),
            acknowledged: Mutex::new(Vec::new()),
            ledger_creations: AtomicUsize::new(0),
        }
    }

    /// Provider reachable at `endpoint`
    pub fn provider(mut self, address: &str, verifiability: Option<&str>, endpoint: &str) -> Self {
        self.services.push(ServiceCandidate::new(address, verifiability));
        self.endpoints.insert(address.to_string(), endpoint.to_string());
        self
    }

    /// Provider whose metadata lookup fails
    pub fn broken_provider(mut self, address: &str, verifiability: Option<&str>) -> Self {
        self.services.push(ServiceCandidate::new(address, verifiability));
        self
    }

    /// Provider whose metadata lookup never returns
    pub fn stalled_provider(mut self, address: &str, verifiability: Option<&str>) -> Self {
        self.services.push(ServiceCandidate::new(address, verifiability));
        self.stalled_metadata.insert(address.to_string());
        self
    }

    /// Verification never returns
    pub fn stall_verification(mut self) -> Self {
        self.stalled_verification = true;
        self
    }

    pub fn verify_result(mut self, result: Result<bool, BrokerError>) -> Self {
        self.verify_result = result;
        self
    }

    pub fn metadata_calls(&self) -> Vec<String> {
        self.metadata_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputeBroker for MockBroker {
    async fn list_services(&self) -> Result<Vec<ServiceCandidate>, BrokerError> {
        Ok(self.services.clone())
    }

    async fn get_service_metadata(&self, provider: &str) -> Result<ServiceMetadata, BrokerError> {
        self.metadata_calls.lock().unwrap().push(provider.to_string());
        if self.stalled_metadata.contains(provider) {
            futures::future::pending::<()>().await;
        }
        match self.endpoints.get(provider) {
            Some(endpoint) => Ok(ServiceMetadata {
                endpoint: endpoint.clone(),
                model: "test-model".to_string(),
            }),
            None => Err(BrokerError::Unavailable(format!("no metadata for {}", provider))),
        }
    }

    async fn acknowledge_provider(&self, provider: &str) -> Result<(), BrokerError> {
        self.acknowledged.lock().unwrap().push(provider.to_string());
        Ok(())
    }

    async fn get_request_headers(
        &self,
        provider: &str,
        _payload: &str,
    ) -> Result<HashMap<String, String>, BrokerError> {
        Ok(HashMap::from([("X-Provider".to_string(), provider.to_string())]))
    }

    async fn verify_response(&self, _provider: &str, _response: &str, id: Option<&str>) -> Result<bool, BrokerError> {
        self.verified_ids.lock().unwrap().push(id.map(str::to_string));
        if self.stalled_verification {
            futures::future::pending::<()>().await;
        }
        self.verify_result.clone()
    }

    async fn create_ledger(&self, _amount: f64) -> Result<(), BrokerError> {
        self.ledger_creations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn deposit_funds(&self, _amount: f64) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// OpenAI-compatible server answering every request with one completion
pub struct ChatServer {
    pub endpoint: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl ChatServer {
    pub async fn start(content: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let body = serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
        })
        .to_string();

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let body = body.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = answer(stream, &body, recorded).await;
                });
            }
        });

        Self { endpoint, requests }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn answer(mut stream: TcpStream, body: &str, recorded: Arc<Mutex<Vec<String>>>) -> Result<()> {
    let request = read_request(&mut stream).await?;
    recorded.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn read_request(stream: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(anyhow!("connection closed mid-request"));
        }
        buf.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return Ok(text);
            }
        }
    }
}

/// Server that accepts connections and never answers
pub async fn start_silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(stream);
            });
        }
    });

    endpoint
}

/// Fetcher serving fixed code
pub struct MockFetcher {
    bytecode: String,
    source: Option<VerifiedSource>,
    pub source_calls: AtomicUsize,
    pub bytecode_calls: AtomicUsize,
}

impl MockFetcher {
    pub fn unverified(bytecode: &str) -> Self {
        Self {
            bytecode: bytecode.to_string(),
            source: None,
            source_calls: AtomicUsize::new(0),
            bytecode_calls: AtomicUsize::new(0),
        }
    }

    pub fn verified(name: &str, code: &str) -> Self {
        Self {
            bytecode: "0x00".to_string(),
            source: Some(VerifiedSource {
                code: code.to_string(),
                compiler_version: "v0.8.20+commit.a1b79de6".to_string(),
                contract_name: name.to_string(),
            }),
            source_calls: AtomicUsize::new(0),
            bytecode_calls: AtomicUsize::new(0),
        }
    }

    pub fn source_calls(&self) -> usize {
        self.source_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractFetcher for MockFetcher {
    async fn fetch_bytecode(&self, _address: &str, _chain_id: u64) -> Result<String> {
        self.bytecode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bytecode.clone())
    }

    async fn fetch_verified_source(&self, _address: &str, _chain_id: u64) -> Result<Option<VerifiedSource>> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.source.clone())
    }
}
