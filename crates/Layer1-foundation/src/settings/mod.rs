//! Settings - 사용자 설정
//!
//! 설정은 `settings.json`(JSON)으로 저장되고, 없으면 기본값을 쓴다.
//! 로드 후 환경변수 오버라이드가 적용된다:
//! - `FILLO_PROVIDER`: 활성 프로바이더
//! - `OLLAMA_HOST`: Ollama 서버 주소 (`http://host:11434`)
//!
//! API 키는 여기에 없다. `credentials` 모듈 참고.

pub mod creativity;
pub mod credentials;
mod provider_kind;
pub mod validation;

pub use creativity::{CreativityPreset, FIELD_SPECIFIC_PRESETS};
pub use credentials::{
    ChainedCredentials, CredentialSource, EnvCredentials, JsonCredentialStore, MemoryCredentials,
};
pub use provider_kind::ProviderKind;
pub use validation::validate_api_key;

use crate::storage::JsonStore;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const SETTINGS_FILE: &str = "settings.json";

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub current_provider: String,

    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderSettings>,

    #[serde(default)]
    pub creativity: CreativitySettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            current_provider: ProviderKind::Openai.id().to_string(),
            providers: default_providers(),
            creativity: CreativitySettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

fn default_providers() -> BTreeMap<String, ProviderSettings> {
    ProviderKind::ALL
        .into_iter()
        .map(|kind| (kind.id().to_string(), ProviderSettings::for_kind(kind)))
        .collect()
}

impl Settings {
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }

    /// Field-type override if present, else the global level
    pub fn creativity_for(&self, field_type: &str) -> f64 {
        self.creativity
            .field_specific
            .get(field_type)
            .copied()
            .unwrap_or(self.creativity.level)
    }

    /// Apply `FILLO_PROVIDER` / `OLLAMA_HOST`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("FILLO_PROVIDER") {
            let provider = provider.trim().to_lowercase();
            if !provider.is_empty() {
                debug!("Provider overridden by FILLO_PROVIDER: {}", provider);
                self.current_provider = provider;
            }
        }

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            let host = host.trim().trim_end_matches('/');
            if !host.is_empty() {
                let base_url = if host.ends_with("/v1") {
                    host.to_string()
                } else {
                    format!("{}/v1", host)
                };
                self.providers
                    .entry(ProviderKind::Ollama.id().to_string())
                    .or_insert_with(|| ProviderSettings::for_kind(ProviderKind::Ollama))
                    .base_url = base_url;
            }
        }
    }
}

/// Per-provider endpoint settings (no credentials)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub name: String,
    pub base_url: String,
    pub default_model: String,
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderSettings {
    pub fn for_kind(kind: ProviderKind) -> Self {
        Self {
            name: kind.display_name().to_string(),
            base_url: kind.default_base_url().to_string(),
            default_model: kind.default_model().to_string(),
            models: kind.models().iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativitySettings {
    pub level: f64,

    #[serde(default)]
    pub preset: CreativityPreset,

    /// field type → level
    #[serde(default)]
    pub field_specific: BTreeMap<String, f64>,
}

impl Default for CreativitySettings {
    fn default() -> Self {
        Self {
            level: creativity::DEFAULT_CREATIVITY,
            preset: CreativityPreset::Balanced,
            field_specific: BTreeMap::new(),
        }
    }
}

impl CreativitySettings {
    /// Apply a preset to the global level
    pub fn set_preset(&mut self, preset: CreativityPreset) {
        self.preset = preset;
        self.level = preset.temperature();
    }

    /// Fill in recommended levels for common field types, keeping explicit ones
    pub fn with_recommended_overrides(mut self) -> Self {
        for (field_type, level) in FIELD_SPECIFIC_PRESETS {
            self.field_specific
                .entry(field_type.to_string())
                .or_insert(*level);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: u32,
    pub expiration_days: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            expiration_days: 7,
        }
    }
}

// ============================================================================
// SettingsSource
// ============================================================================

/// Where the provider manager and generator read settings from
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<Settings>;
}

/// `settings.json` in a [`JsonStore`], plus environment overrides
#[derive(Debug, Clone)]
pub struct JsonSettingsSource {
    store: JsonStore,
}

impl JsonSettingsSource {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Validate and write settings
    pub fn save(&self, settings: &Settings) -> Result<()> {
        settings
            .validate()
            .map_err(|errors| Error::Validation(errors.join("; ")))?;
        self.store.save(SETTINGS_FILE, settings)
    }

    fn load_blocking(&self) -> Result<Settings> {
        let mut settings = self
            .store
            .load_optional::<Settings>(SETTINGS_FILE)?
            .unwrap_or_default();
        settings.apply_env_overrides();
        Ok(settings)
    }
}

#[async_trait]
impl SettingsSource for JsonSettingsSource {
    async fn load(&self) -> Result<Settings> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.load_blocking())
            .await
            .map_err(|e| Error::Internal(format!("Settings load task failed: {}", e)))?
    }
}

/// In-memory settings, swappable at runtime
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    inner: Arc<RwLock<Settings>>,
}

impl StaticSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn set(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.inner.write());
    }
}

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn load(&self) -> Result<Settings> {
        Ok(self.inner.read().clone())
    }
}
