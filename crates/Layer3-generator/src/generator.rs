//! Content Generator - cache, then provider, then cache
//!
//! ## 흐름
//!
//! ```text
//! generate_for_field
//!   ├─ use_cache && !force_regenerate && cache.enabled
//!   │     └─ CacheManager::get / get_multiple ── hit ──▶ cached: true
//!   ├─ ProviderManager::generate_content
//!   │     ├─ ok  ──▶ CacheManager::set (cache.enabled && use_cache) ──▶ cached: false
//!   │     └─ err ──▶ use_cache && get_similar(.., 1) ── found ──▶ cached: true
//!   └─ 그 외: 에러 전파
//! ```

use crate::history::{GenerationHistory, RECENT_FOR_PROMPT};
use crate::options::{GenerateOptions, MultipleOptions};
use fillo_foundation::cache::DEFAULT_SIMILAR_LIMIT;
use fillo_foundation::{
    clamp_creativity, CacheEntry, CacheManager, CacheStats, CacheWrite, CleanupReport, Error,
    FieldInfo, Result, Settings,
};
use fillo_provider::{GenerateParams, GenerationResponse, ProviderManager};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Creativity step between variants in [`ContentGenerator::generate_multiple`]
pub const VARIANT_CREATIVITY_STEP: f64 = 0.2;

/// Single entry point for form content
pub struct ContentGenerator {
    cache: CacheManager,
    providers: Arc<ProviderManager>,
    history: GenerationHistory,
    initialized: OnceCell<()>,
}

impl ContentGenerator {
    pub fn new(cache: CacheManager, providers: Arc<ProviderManager>) -> Self {
        Self {
            cache,
            providers,
            history: GenerationHistory::new(),
            initialized: OnceCell::new(),
        }
    }

    /// Runs once; later calls return immediately
    pub async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                self.providers.initialize().await?;
                info!(
                    "Content generator initialized (schema v{})",
                    self.cache.store().schema_version().await?
                );
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    async fn settings(&self) -> Result<Settings> {
        self.initialize().await?;
        self.providers.settings().await
    }

    fn resolve_creativity(settings: &Settings, field: &FieldInfo, requested: Option<f64>) -> f64 {
        clamp_creativity(requested.unwrap_or_else(|| settings.creativity_for(&field.field_type)))
    }

    /// Produce a value for one field
    pub async fn generate_for_field(
        &self,
        field: &FieldInfo,
        options: GenerateOptions,
    ) -> Result<GenerationResponse> {
        let settings = self.settings().await?;
        let creativity = Self::resolve_creativity(&settings, field, options.creativity_level);
        let caching = settings.cache.enabled && options.use_cache;

        if caching && !options.force_regenerate {
            if let Some(entry) = self
                .lookup(&field.signature, creativity, options.return_multiple)
                .await
            {
                debug!("Cache hit for field: {}", field.signature);
                return Ok(from_entry(entry));
            }
        }

        info!("Generating new content for field: {}", field.signature);

        let previous = if options.previous_generations.is_empty() {
            self.history.recent(&field.signature, RECENT_FOR_PROMPT)
        } else {
            options.previous_generations
        };
        let params = GenerateParams {
            context: options.context,
            page_context: options.page_context,
            previous_generations: previous,
            creativity_level: Some(creativity),
        };

        let generated = self
            .providers
            .generate_content(field, params)
            .await
            .and_then(|response| {
                if response.content.trim().is_empty() {
                    Err(Error::EmptyResponse(response.provider))
                } else {
                    Ok(response)
                }
            });

        match generated {
            Ok(response) => {
                self.history.record(&field.signature, &response.content);
                if caching {
                    self.store(field, &response, settings.cache.expiration_days)
                        .await;
                }
                Ok(response)
            }
            Err(e) => {
                warn!("Failed to generate content for {}: {}", field.signature, e);
                if options.use_cache {
                    if let Some(entry) = self.fallback(&field.signature, creativity).await {
                        info!("Using similar cached content as fallback");
                        return Ok(from_entry(entry));
                    }
                }
                Err(e)
            }
        }
    }

    /// Lookup failures degrade to a miss
    async fn lookup(&self, signature: &str, creativity: f64, pick_random: bool) -> Option<CacheEntry> {
        let found = if pick_random {
            self.cache
                .get_multiple(signature, creativity, DEFAULT_SIMILAR_LIMIT)
                .await
                .map(|entries| entries.choose(&mut rand::thread_rng()).cloned())
        } else {
            self.cache.get(signature, creativity).await
        };

        found.unwrap_or_else(|e| {
            warn!("Cache lookup failed, generating instead: {}", e);
            None
        })
    }

    async fn store(&self, field: &FieldInfo, response: &GenerationResponse, expiration_days: u32) {
        let write = CacheWrite::new(
            &field.signature,
            &field.field_type,
            response.creativity_level,
            &response.content,
            &response.provider,
            &response.model,
        )
        .expires_in_days(expiration_days);

        if let Err(e) = self.cache.set(write).await {
            warn!("Failed to cache generated content: {}", e);
        }
    }

    async fn fallback(&self, signature: &str, creativity: f64) -> Option<CacheEntry> {
        match self.cache.get_similar(signature, creativity, 1).await {
            Ok(entries) => entries.into_iter().next(),
            Err(e) => {
                warn!("Fallback lookup failed: {}", e);
                None
            }
        }
    }

    /// Cached values for this field or its siblings; never calls a provider
    pub async fn get_suggestions(
        &self,
        field: &FieldInfo,
        limit: usize,
    ) -> Result<Vec<GenerationResponse>> {
        let settings = self.settings().await?;
        let creativity = Self::resolve_creativity(&settings, field, None);
        let entries = self
            .cache
            .get_similar(&field.signature, creativity, limit)
            .await?;
        Ok(entries.into_iter().map(from_entry).collect())
    }

    /// `count` fresh generations with rising creativity; failed variants are skipped
    pub async fn generate_multiple(
        &self,
        field: &FieldInfo,
        count: usize,
        options: MultipleOptions,
    ) -> Result<Vec<GenerationResponse>> {
        let settings = self.settings().await?;
        let base = settings.creativity_for(&field.field_type);
        let mut results = Vec::with_capacity(count);

        for i in 0..count {
            let creativity = if options.vary_creativity {
                clamp_creativity(base + i as f64 * VARIANT_CREATIVITY_STEP)
            } else {
                clamp_creativity(base)
            };

            let mut variant = GenerateOptions::default()
                .no_cache()
                .force_regenerate()
                .with_creativity(creativity);
            variant.context = options.context.clone();
            variant.page_context = options.page_context.clone();

            match self.generate_for_field(field, variant).await {
                Ok(response) => results.push(response),
                Err(e) => warn!("Failed to generate suggestion {}: {}", i + 1, e),
            }
        }

        Ok(results)
    }

    /// Drop every cache entry, the hit/miss counters and the history
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        self.history.clear();
        info!("Cache cleared");
        Ok(())
    }

    pub async fn get_cache_stats(&self) -> Result<CacheStats> {
        self.cache.get_stats().await
    }

    /// One cleanup pass with the configured capacity
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let settings = self.settings().await?;
        let report = self
            .cache
            .cleanup(settings.cache.max_entries as usize)
            .await?;
        if report.total() > 0 {
            info!(
                "Cache cleanup: {} expired, {} evicted",
                report.expired_removed, report.evicted
            );
        }
        Ok(report)
    }

    /// Whether caching is switched on in the current settings
    pub async fn cache_enabled(&self) -> Result<bool> {
        Ok(self.settings().await?.cache.enabled)
    }

    pub async fn has_provider(&self) -> bool {
        if let Err(e) = self.initialize().await {
            warn!("Initialization failed: {}", e);
            return false;
        }
        self.providers.has_configured_provider().await
    }

    pub async fn test_connection(&self, provider: &str) -> bool {
        self.providers.test_connection(provider).await
    }

    /// Re-read settings and credentials
    pub async fn refresh_settings(&self) -> Result<()> {
        self.providers.refresh_settings().await
    }

    pub fn providers(&self) -> &Arc<ProviderManager> {
        &self.providers
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }
}

fn from_entry(entry: CacheEntry) -> GenerationResponse {
    GenerationResponse {
        content: entry.generated_content,
        provider: entry.provider,
        model: entry.model,
        creativity_level: entry.creativity_level,
        cached: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fillo_foundation::CacheStore;

    #[tokio::test]
    async fn test_from_entry_is_cached() {
        let cache = CacheManager::new(CacheStore::in_memory().unwrap());
        cache
            .set(CacheWrite::new(
                "email-email-signup",
                "email",
                0.3,
                "a@example.com",
                "OpenAI",
                "gpt-4o-mini",
            ))
            .await
            .unwrap();
        let entry = cache.get("email-email-signup", 0.3).await.unwrap().unwrap();

        let response = from_entry(entry);
        assert!(response.cached);
        assert_eq!(response.content, "a@example.com");
        assert_eq!(response.provider, "OpenAI");
        assert_eq!(response.model, "gpt-4o-mini");
        assert_eq!(response.creativity_level, 0.3);
    }
}
