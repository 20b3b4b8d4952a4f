//! ContentGenerator 통합 테스트 - 가짜 프로바이더를 레지스트리에 등록해서 사용
//!
//! `cargo test -p fillo-generator --test generator_flow`

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use fillo_foundation::{
    CacheManager, CacheStore, CacheWrite, Error, FieldInfo, ManualClock, MemoryCredentials,
    StaticSettings,
};
use fillo_generator::{ContentGenerator, GenerateOptions, MaintenanceTask, MultipleOptions};
use fillo_provider::{
    GenerationRequest, Provider, ProviderError, ProviderInit, ProviderManager, ProviderRegistry,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fake provider
// ============================================================================

#[derive(Default)]
struct FakeState {
    calls: AtomicUsize,
    fail: AtomicBool,
    fail_on_call: Mutex<Option<usize>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

struct FakeProvider {
    state: Arc<FakeState>,
}

#[async_trait]
impl Provider for FakeProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn name(&self) -> &str {
        "Fake"
    }

    fn model(&self) -> &str {
        "fake-1"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["fake-1".to_string()]
    }

    async fn test_connection(&self) -> bool {
        true
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let n = self.state.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.requests.lock().unwrap().push(request.clone());

        if self.state.fail.load(Ordering::SeqCst)
            || *self.state.fail_on_call.lock().unwrap() == Some(n)
        {
            return Err(ProviderError::ServerError("backend down".to_string()));
        }
        Ok(format!("{} value {}", request.field_info.field_type, n))
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    generator: Arc<ContentGenerator>,
    settings: StaticSettings,
    creds: MemoryCredentials,
    clock: Arc<ManualClock>,
    fake: Arc<FakeState>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = CacheStore::in_memory().unwrap().with_clock(clock.clone());

        let fake = Arc::new(FakeState::default());
        let mut registry = ProviderRegistry::new();
        let state = Arc::clone(&fake);
        registry.register("openai", move |_init: ProviderInit| {
            Ok(Arc::new(FakeProvider {
                state: Arc::clone(&state),
            }) as Arc<dyn Provider>)
        });

        let settings = StaticSettings::default();
        let creds = MemoryCredentials::new().with_key("openai", "sk-test");
        let providers = Arc::new(ProviderManager::new(
            Arc::new(settings.clone()),
            Arc::new(creds.clone()),
            registry,
        ));

        Self {
            generator: Arc::new(ContentGenerator::new(CacheManager::new(store), providers)),
            settings,
            creds,
            clock,
            fake,
        }
    }

    fn calls(&self) -> usize {
        self.fake.calls.load(Ordering::SeqCst)
    }

    async fn refresh(&self) {
        self.generator.refresh_settings().await.unwrap();
    }
}

fn email_field() -> FieldInfo {
    FieldInfo::new("email", "Email Address", "Signup form")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_miss_then_hit() {
    let h = Harness::new();
    let field = email_field();

    let first = h
        .generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();
    assert!(!first.cached);
    assert_eq!(first.content, "email value 1");
    assert_eq!(first.provider, "Fake");
    assert_eq!(first.model, "fake-1");

    let second = h
        .generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.content, "email value 1");
    assert_eq!(h.calls(), 1);

    let stats = h.generator.get_cache_stats().await.unwrap();
    assert_eq!(stats.store.total_entries, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert!((stats.hit_rate - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_cache_disabled_always_calls_provider() {
    let h = Harness::new();
    h.settings.update(|s| s.cache.enabled = false);
    let field = email_field();

    for _ in 0..3 {
        let response = h
            .generator
            .generate_for_field(&field, GenerateOptions::default())
            .await
            .unwrap();
        assert!(!response.cached);
    }
    assert_eq!(h.calls(), 3);

    let stats = h.generator.get_cache_stats().await.unwrap();
    assert_eq!(stats.store.total_entries, 0);
    assert_eq!(stats.cache_hits + stats.cache_misses, 0);
}

#[tokio::test]
async fn test_use_cache_false_skips_read_and_write() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default().no_cache())
        .await
        .unwrap();
    h.generator
        .generate_for_field(&field, GenerateOptions::default().no_cache())
        .await
        .unwrap();

    assert_eq!(h.calls(), 2);
    let stats = h.generator.get_cache_stats().await.unwrap();
    assert_eq!(stats.store.total_entries, 0);
}

#[tokio::test]
async fn test_force_regenerate_inserts_new_row() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();
    let forced = h
        .generator
        .generate_for_field(&field, GenerateOptions::default().force_regenerate())
        .await
        .unwrap();

    assert!(!forced.cached);
    assert_eq!(forced.content, "email value 2");
    let stats = h.generator.get_cache_stats().await.unwrap();
    assert_eq!(stats.store.total_entries, 2);
}

#[tokio::test]
async fn test_failure_falls_back_to_similar_entry() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();

    h.fake.fail.store(true, Ordering::SeqCst);
    let response = h
        .generator
        .generate_for_field(&field, GenerateOptions::default().force_regenerate())
        .await
        .unwrap();

    assert!(response.cached);
    assert_eq!(response.content, "email value 1");
    assert_eq!(h.calls(), 2);
}

#[tokio::test]
async fn test_failure_without_fallback_names_provider() {
    let h = Harness::new();
    h.fake.fail.store(true, Ordering::SeqCst);

    let err = h
        .generator
        .generate_for_field(&email_field(), GenerateOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::Api { provider, message } => {
            assert_eq!(provider, "Fake");
            assert!(message.contains("backend down"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_no_credential() {
    let h = Harness::new();
    h.creds.remove("openai");
    h.refresh().await;

    assert!(!h.generator.has_provider().await);
    let err = h
        .generator
        .generate_for_field(&email_field(), GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoProviderConfigured(_)));
    assert!(!h.generator.test_connection("ollama").await);
}

#[tokio::test]
async fn test_expired_entry_is_regenerated() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();

    h.clock.advance(ChronoDuration::days(8));
    let response = h
        .generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();

    assert!(!response.cached);
    assert_eq!(h.calls(), 2);
}

#[tokio::test]
async fn test_field_override_selects_cache_band() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();

    // 0.7 → 1.5: outside the ±0.1 window
    h.settings
        .update(|s| {
            s.creativity.field_specific.insert("email".to_string(), 1.5);
        });
    h.refresh().await;

    let response = h
        .generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();
    assert!(!response.cached);
    assert_eq!(response.creativity_level, 1.5);
}

#[tokio::test]
async fn test_generate_multiple_varies_creativity_and_skips_failures() {
    let h = Harness::new();
    *h.fake.fail_on_call.lock().unwrap() = Some(2);

    let results = h
        .generator
        .generate_multiple(&email_field(), 3, MultipleOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.cached));

    let requests = h.fake.requests.lock().unwrap();
    let levels: Vec<f64> = requests.iter().map(|r| r.creativity_level).collect();
    assert_eq!(levels.len(), 3);
    assert!((levels[0] - 0.7).abs() < 1e-9);
    assert!((levels[1] - 0.9).abs() < 1e-9);
    assert!((levels[2] - 1.1).abs() < 1e-9);
    drop(requests);

    let stats = h.generator.get_cache_stats().await.unwrap();
    assert_eq!(stats.store.total_entries, 0);
}

#[tokio::test]
async fn test_generate_multiple_clamps_at_max() {
    let h = Harness::new();
    h.settings.update(|s| s.creativity.level = 1.8);
    h.refresh().await;

    h.generator
        .generate_multiple(&email_field(), 3, MultipleOptions::default())
        .await
        .unwrap();

    let requests = h.fake.requests.lock().unwrap();
    assert!((requests[1].creativity_level - 2.0).abs() < 1e-9);
    assert!((requests[2].creativity_level - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_suggestions_read_cache_only() {
    let h = Harness::new();
    let cache = h.generator.cache();
    cache
        .set(CacheWrite::new(
            "email-email-signup",
            "email",
            0.7,
            "a@example.com",
            "OpenAI",
            "gpt-4o-mini",
        ))
        .await
        .unwrap();
    cache
        .set(CacheWrite::new(
            "email-email-checkout",
            "email",
            0.7,
            "b@example.com",
            "OpenAI",
            "gpt-4o-mini",
        ))
        .await
        .unwrap();

    let field = FieldInfo::new("email", "Email", "signup");
    let suggestions = h.generator.get_suggestions(&field, 5).await.unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].content, "a@example.com");
    assert!(suggestions.iter().all(|s| s.cached));
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn test_history_feeds_previous_generations() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default().no_cache())
        .await
        .unwrap();
    h.generator
        .generate_for_field(&field, GenerateOptions::default().no_cache())
        .await
        .unwrap();
    h.generator
        .generate_for_field(
            &field,
            GenerateOptions::default()
                .no_cache()
                .with_previous(vec!["caller value".to_string()]),
        )
        .await
        .unwrap();

    let requests = h.fake.requests.lock().unwrap();
    assert!(requests[0].previous_generations.is_empty());
    assert_eq!(requests[1].previous_generations, vec!["email value 1"]);
    assert_eq!(requests[2].previous_generations, vec!["caller value"]);
}

#[tokio::test]
async fn test_clear_cache_resets_everything() {
    let h = Harness::new();
    let field = email_field();

    h.generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();
    h.generator.clear_cache().await.unwrap();

    let stats = h.generator.get_cache_stats().await.unwrap();
    assert_eq!(stats.store.total_entries, 0);
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.cache_misses, 0);
    assert_eq!(stats.hit_rate, 0.0);

    h.generator
        .generate_for_field(&field, GenerateOptions::default())
        .await
        .unwrap();
    let requests = h.fake.requests.lock().unwrap();
    assert!(requests[1].previous_generations.is_empty());
}

#[tokio::test]
async fn test_return_multiple_picks_cached_candidate() {
    let h = Harness::new();
    let field = email_field();

    for _ in 0..3 {
        h.generator
            .generate_for_field(&field, GenerateOptions::default().force_regenerate())
            .await
            .unwrap();
    }

    let response = h
        .generator
        .generate_for_field(&field, GenerateOptions::default().return_multiple())
        .await
        .unwrap();
    assert!(response.cached);
    assert!(["email value 1", "email value 2", "email value 3"]
        .contains(&response.content.as_str()));
    assert_eq!(h.calls(), 3);
}

#[tokio::test]
async fn test_cleanup_uses_configured_capacity() {
    let h = Harness::new();
    h.settings.update(|s| s.cache.max_entries = 2);
    h.refresh().await;

    for _ in 0..4 {
        h.generator
            .generate_for_field(&email_field(), GenerateOptions::default().force_regenerate())
            .await
            .unwrap();
        h.clock.advance(ChronoDuration::seconds(1));
    }

    let report = h.generator.cleanup().await.unwrap();
    assert_eq!(report.evicted, 2);
    assert_eq!(report.expired_removed, 0);
    assert_eq!(
        h.generator.get_cache_stats().await.unwrap().store.total_entries,
        2
    );
}

#[tokio::test]
async fn test_maintenance_task_runs_cleanup() {
    let h = Harness::new();
    h.settings.update(|s| s.cache.max_entries = 1);

    for _ in 0..3 {
        h.generator
            .generate_for_field(&email_field(), GenerateOptions::default().force_regenerate())
            .await
            .unwrap();
        h.clock.advance(ChronoDuration::seconds(1));
    }

    let mut task = MaintenanceTask::spawn(Arc::clone(&h.generator), Duration::from_millis(20));
    let report = tokio::time::timeout(Duration::from_secs(5), task.next_report())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.evicted, 2);
    assert!(task.is_running());
    assert!(task.last_report().is_some());
    task.stop();
}
