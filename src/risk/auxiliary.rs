use async_trait::async_trait;

use super::types::Finding;

/// Additional analysis run alongside AI scoring, such as deployer history or
/// interaction patterns
#[async_trait]
pub trait AuxiliaryAnalysis: Send + Sync {
    /// Short name used in logs and milestone messages
    fn name(&self) -> &str;

    async fn analyze(&self, address: &str, chain_id: u64) -> anyhow::Result<Vec<Finding>>;
}

/// Analysis that reports nothing
#[derive(Debug, Clone)]
pub struct NoopAnalysis {
    name: String,
}

impl NoopAnalysis {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl AuxiliaryAnalysis for NoopAnalysis {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, _address: &str, _chain_id: u64) -> anyhow::Result<Vec<Finding>> {
        Ok(Vec::new())
    }
}
