// Report cache
//
// Finished reports are cached per (address, chain) with a TTL chosen by the
// engine: short for upgradeable contracts, long for everything else.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::api::types::RiskReport;

/// Persistent store for finished reports
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Unexpired report for a contract
    async fn get(&self, address: &str, chain_id: u64) -> Result<Option<RiskReport>>;

    async fn put(&self, address: &str, chain_id: u64, report: &RiskReport, ttl: Duration) -> Result<()>;

    /// Drop expired entries, returning how many were removed
    async fn invalidate_expired(&self) -> Result<usize>;
}

struct CacheEntry {
    report: RiskReport,
    expires_at: Instant,
}

/// Process-local TTL cache
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<(String, u64), CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remaining lifetime of an entry
    pub async fn time_to_live(&self, address: &str, chain_id: u64) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries
            .get(&key(address, chain_id))
            .map(|entry| entry.expires_at.saturating_duration_since(Instant::now()))
    }
}

fn key(address: &str, chain_id: u64) -> (String, u64) {
    (address.to_lowercase(), chain_id)
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, address: &str, chain_id: u64) -> Result<Option<RiskReport>> {
        let entries = self.entries.read().await;
        let report = entries
            .get(&key(address, chain_id))
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.report.clone());
        Ok(report)
    }

    async fn put(&self, address: &str, chain_id: u64, report: &RiskReport, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            report: report.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key(address, chain_id), entry);
        debug!("Cached report for {} on chain {} for {:?}", address, chain_id, ttl);
        Ok(())
    }

    async fn invalidate_expired(&self) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::RiskSeverity;

    fn report(address: &str) -> RiskReport {
        RiskReport {
            address: address.to_string(),
            chain_id: 1,
            score: 90,
            severity: RiskSeverity::Low,
            findings: Vec::new(),
            recommendations: Vec::new(),
            milestones: Vec::new(),
            is_verified: true,
            contract_name: None,
            is_upgradeable: false,
            reason: String::new(),
            used_fallback: false,
            quality: None,
            bytecode_analysis: None,
            timestamp: String::new(),
            from_cache: false,
        }
    }

    #[tokio::test]
    async fn test_put_get_case_insensitive() -> Result<()> {
        let cache = InMemoryCache::new();
        cache.put("0xABCD", 1, &report("0xabcd"), Duration::from_secs(60)).await?;

        assert!(cache.get("0xabcd", 1).await?.is_some());
        assert!(cache.get("0xAbCd", 1).await?.is_some());
        assert!(cache.get("0xabcd", 137).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entries() -> Result<()> {
        let cache = InMemoryCache::new();
        cache.put("0x01", 1, &report("0x01"), Duration::ZERO).await?;
        cache.put("0x02", 1, &report("0x02"), Duration::from_secs(60)).await?;

        assert!(cache.get("0x01", 1).await?.is_none());
        assert_eq!(cache.len().await, 2);

        assert_eq!(cache.invalidate_expired().await?, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("0x02", 1).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_time_to_live() -> Result<()> {
        let cache = InMemoryCache::new();
        cache.put("0x01", 1, &report("0x01"), Duration::from_secs(3600)).await?;

        let ttl = cache.time_to_live("0x01", 1).await.unwrap();
        assert!(ttl > Duration::from_secs(3500));
        assert!(cache.time_to_live("0x02", 1).await.is_none());
        Ok(())
    }
}
