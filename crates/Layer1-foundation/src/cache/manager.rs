//! Cache Manager
//!
//! 조회 정책(허용 오차), 유사 항목 조회, 히트/미스 통계를 담당한다.
//! 실제 저장은 [`CacheStore`]가 한다.

use crate::clock::Clock;
use crate::storage::{CacheEntry, CacheStore, CleanupReport, NewCacheEntry, StoreStats};
use crate::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Creativity window for exact-signature lookups
pub const GET_TOLERANCE: f64 = 0.1;
/// Creativity window for same-type lookups
pub const TYPE_TOLERANCE: f64 = 0.2;
pub const DEFAULT_EXPIRATION_DAYS: u32 = 7;
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;
pub const DEFAULT_TYPE_LIMIT: usize = 5;
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

const HITS: &str = "cache_hits";
const MISSES: &str = "cache_misses";

/// One generation result to record
#[derive(Debug, Clone, PartialEq)]
pub struct CacheWrite {
    pub signature: String,
    pub field_type: String,
    pub creativity_level: f64,
    pub content: String,
    pub provider: String,
    pub model: String,
    pub expiration_days: u32,
}

impl CacheWrite {
    pub fn new(
        signature: impl Into<String>,
        field_type: impl Into<String>,
        creativity_level: f64,
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            signature: signature.into(),
            field_type: field_type.into(),
            creativity_level,
            content: content.into(),
            provider: provider.into(),
            model: model.into(),
            expiration_days: DEFAULT_EXPIRATION_DAYS,
        }
    }

    pub fn expires_in_days(mut self, days: u32) -> Self {
        self.expiration_days = days;
        self
    }
}

/// Store stats plus hit/miss accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    #[serde(flatten)]
    pub store: StoreStats,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Percentage, 0 when nothing was looked up yet
    pub hit_rate: f64,
}

/// Lookup policy over a [`CacheStore`]
#[derive(Clone)]
pub struct CacheManager {
    store: CacheStore,
}

impl CacheManager {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Closest valid entry within ±0.1, counted as a hit or miss
    pub async fn get(&self, signature: &str, creativity: f64) -> Result<Option<CacheEntry>> {
        let found = self
            .store
            .query_by_signature(signature, creativity, GET_TOLERANCE)
            .await?;
        self.record_lookup(signature, found.is_some()).await;
        Ok(found)
    }

    /// Several valid entries within ±0.1 for the caller to choose from
    ///
    /// Counts one hit when anything matched, one miss otherwise.
    pub async fn get_multiple(
        &self,
        signature: &str,
        creativity: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>> {
        let found = self
            .store
            .query_by_signature_many(signature, creativity, GET_TOLERANCE, limit)
            .await?;
        self.record_lookup(signature, !found.is_empty()).await;
        Ok(found)
    }

    /// Record a fresh generation; never overwrites earlier rows
    pub async fn set(&self, write: CacheWrite) -> Result<i64> {
        let created_at = self.store.clock().now();
        let expires_at = created_at + Duration::days(i64::from(write.expiration_days));
        let signature = write.signature.clone();

        let id = self
            .store
            .insert(NewCacheEntry {
                field_signature: write.signature,
                field_type: write.field_type,
                creativity_level: write.creativity_level,
                generated_content: write.content,
                provider: write.provider,
                model: write.model,
                created_at,
                expires_at,
            })
            .await?;

        debug!("Cached entry {} for {}", id, signature);
        Ok(id)
    }

    /// Entries for this field or its siblings (same base signature)
    pub async fn get_similar(
        &self,
        signature: &str,
        creativity: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>> {
        self.store
            .query_all_similar(signature, creativity, limit)
            .await
    }

    /// Entries of the same field type within ±0.2
    pub async fn get_by_type(
        &self,
        field_type: &str,
        creativity: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>> {
        self.store
            .query_by_type(field_type, creativity, limit, TYPE_TOLERANCE)
            .await
    }

    pub async fn cleanup(&self, max_entries: usize) -> Result<CleanupReport> {
        self.store.cleanup(max_entries).await
    }

    /// Drop every entry and reset the counters
    pub async fn clear(&self) -> Result<()> {
        let removed = self.store.clear().await?;
        self.store.reset_counters().await?;
        debug!("Cache cleared ({} entries)", removed);
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<CacheStats> {
        let store = self.store.stats().await?;
        let cache_hits = self.store.counter(HITS).await?;
        let cache_misses = self.store.counter(MISSES).await?;
        let requests = cache_hits + cache_misses;
        let hit_rate = if requests == 0 {
            0.0
        } else {
            cache_hits as f64 / requests as f64 * 100.0
        };

        Ok(CacheStats {
            store,
            cache_hits,
            cache_misses,
            hit_rate,
        })
    }

    async fn record_lookup(&self, signature: &str, hit: bool) {
        let (counter, label) = if hit { (HITS, "hit") } else { (MISSES, "miss") };
        debug!("Cache {} for {}", label, signature);
        if let Err(e) = self.store.increment_counter(counter).await {
            warn!("Failed to update cache {} counter: {}", label, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{timestamp, ManualClock};
    use std::sync::Arc;

    fn manager() -> (CacheManager, ManualClock) {
        let clock = ManualClock::default();
        let store = CacheStore::in_memory()
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        (CacheManager::new(store), clock)
    }

    fn write(signature: &str, creativity: f64, content: &str) -> CacheWrite {
        CacheWrite::new(signature, "email", creativity, content, "OpenAI", "gpt-4o-mini")
    }

    #[tokio::test]
    async fn test_set_then_get_within_tolerance() {
        let (cache, _) = manager();
        cache
            .set(write("email-email-signup", 0.7, "a@example.com"))
            .await
            .unwrap();

        let hit = cache.get("email-email-signup", 0.8).await.unwrap();
        assert_eq!(hit.map(|e| e.generated_content).as_deref(), Some("a@example.com"));
        assert!(cache.get("email-email-signup", 0.85).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_after_eight_days() {
        let (cache, clock) = manager();
        cache
            .set(write("email-email-signup", 0.7, "a@example.com"))
            .await
            .unwrap();

        clock.advance(Duration::days(8));
        assert!(cache.get("email-email-signup", 0.7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_expiration() {
        let (cache, clock) = manager();
        let id = cache
            .set(write("email-email-signup", 0.7, "a@example.com").expires_in_days(1))
            .await
            .unwrap();
        assert!(id > 0);

        let stored = cache.get("email-email-signup", 0.7).await.unwrap().unwrap();
        assert_eq!(stored.expires_at - stored.created_at, Duration::days(1));
        assert_eq!(timestamp(stored.created_at), timestamp(clock.now()));
    }

    #[tokio::test]
    async fn test_hit_rate() {
        let (cache, _) = manager();
        assert_eq!(cache.get_stats().await.unwrap().hit_rate, 0.0);

        cache.set(write("email-e-s", 0.7, "x")).await.unwrap();
        cache.get("email-e-s", 0.7).await.unwrap();
        cache.get("email-e-s", 0.7).await.unwrap();
        cache.get("email-e-s", 0.7).await.unwrap();
        cache.get("missing-sig", 0.7).await.unwrap();

        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.cache_hits, 3);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.hit_rate, 75.0);
        assert_eq!(stats.store.total_entries, 1);
    }

    #[tokio::test]
    async fn test_clear_resets_counters() {
        let (cache, _) = manager();
        cache.set(write("email-e-s", 0.7, "x")).await.unwrap();
        cache.get("email-e-s", 0.7).await.unwrap();

        cache.clear().await.unwrap();
        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.store.total_entries, 0);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn test_get_multiple_and_by_type() {
        let (cache, clock) = manager();
        for (i, level) in [0.6, 0.7, 0.8, 0.9].iter().enumerate() {
            clock.advance(Duration::seconds(1));
            cache
                .set(write("email-e-s", *level, &format!("v{}", i)))
                .await
                .unwrap();
        }

        let multiple = cache.get_multiple("email-e-s", 0.7, 10).await.unwrap();
        assert_eq!(multiple.len(), 3);
        assert_eq!(multiple[0].generated_content, "v1");

        let by_type = cache.get_by_type("email", 0.7, 5).await.unwrap();
        assert_eq!(by_type.len(), 4);

        assert_eq!(cache.get_stats().await.unwrap().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_stats_json_is_flat() {
        let (cache, _) = manager();
        cache.set(write("email-e-s", 0.7, "x")).await.unwrap();
        let json = serde_json::to_value(cache.get_stats().await.unwrap()).unwrap();
        assert_eq!(json["totalEntries"], 1);
        assert_eq!(json["entriesByType"]["email"], 1);
        assert_eq!(json["hitRate"], 0.0);
    }
}
