//! Provider Manager - routes generation requests to the active adapter
//!
//! 설정의 `currentProvider`로 활성 어댑터를 고르고, 자격증명이 있는
//! 프로바이더만 어댑터를 만든다.
//!
//! ```text
//! Unconfigured ──(키 추가 + initialize/refresh/lazy)──▶ Configured
//!      ▲                                                    │
//!      └──────────────(키 제거 + refresh_settings)──────────┘
//! ```

use crate::r#trait::{GenerationRequest, GenerationResponse, Provider};
use crate::registry::{ProviderInit, ProviderRegistry};
use fillo_foundation::settings::creativity::clamp_creativity;
use fillo_foundation::{
    CredentialSource, Error, FieldInfo, PageContext, ProviderKind, ProviderSettings, Result,
    Settings, SettingsSource,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Optional inputs for [`ProviderManager::generate_content`]
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub context: Option<String>,
    pub page_context: Option<PageContext>,
    pub previous_generations: Vec<String>,
    /// Overrides the configured level for this call
    pub creativity_level: Option<f64>,
}

#[derive(Default)]
struct ManagerState {
    settings: Settings,
    providers: HashMap<String, Arc<dyn Provider>>,
    initialized: bool,
}

/// Owns the adapter map and dispatches to the active provider
pub struct ProviderManager {
    settings_source: Arc<dyn SettingsSource>,
    credentials: Arc<dyn CredentialSource>,
    registry: ProviderRegistry,
    state: RwLock<ManagerState>,
}

impl ProviderManager {
    pub fn new(
        settings_source: Arc<dyn SettingsSource>,
        credentials: Arc<dyn CredentialSource>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            settings_source,
            credentials,
            registry,
            state: RwLock::new(ManagerState::default()),
        }
    }

    /// Load settings and build an adapter for every credentialed provider
    pub async fn initialize(&self) -> Result<()> {
        let settings = self.settings_source.load().await?;
        let providers = self.build_all(&settings).await?;

        info!(
            "Provider manager ready: current={}, configured=[{}]",
            settings.current_provider,
            sorted_keys(&providers).join(", ")
        );

        let mut state = self.state.write().await;
        state.settings = settings;
        state.providers = providers;
        state.initialized = true;
        Ok(())
    }

    /// Re-read settings and rebuild the adapter map from scratch
    pub async fn refresh_settings(&self) -> Result<()> {
        debug!("Refreshing provider settings");
        self.initialize().await
    }

    async fn ensure_initialized(&self) -> Result<()> {
        if self.state.read().await.initialized {
            return Ok(());
        }
        self.initialize().await
    }

    async fn build_all(&self, settings: &Settings) -> Result<HashMap<String, Arc<dyn Provider>>> {
        let mut providers = HashMap::new();
        for name in self.registry.names() {
            if let Some(provider) = self.build_one(settings, &name).await? {
                providers.insert(name, provider);
            }
        }
        Ok(providers)
    }

    /// `None` while the provider has no credential
    async fn build_one(&self, settings: &Settings, name: &str) -> Result<Option<Arc<dyn Provider>>> {
        let Some(api_key) = self.credentials.get_api_key(name).await? else {
            return Ok(None);
        };

        let Some(provider_settings) = provider_settings(settings, name) else {
            warn!("No settings for provider '{}', skipping", name);
            return Ok(None);
        };

        let init = ProviderInit::new(
            api_key,
            provider_settings.base_url,
            provider_settings.default_model,
        );
        let provider = self.registry.build(name, init)?;
        debug!("Built {} adapter (model {})", provider.name(), provider.model());
        Ok(Some(provider))
    }

    /// Adapter for `name`, building it if a credential has appeared since the last refresh
    pub async fn get_provider(&self, name: &str) -> Result<Option<Arc<dyn Provider>>> {
        if !self.registry.contains(name) {
            return Err(Error::ProviderNotFound(name.to_string()));
        }
        self.ensure_initialized().await?;

        let settings = {
            let state = self.state.read().await;
            if let Some(provider) = state.providers.get(name) {
                return Ok(Some(Arc::clone(provider)));
            }
            state.settings.clone()
        };

        let Some(provider) = self.build_one(&settings, name).await? else {
            return Ok(None);
        };

        let mut state = self.state.write().await;
        let provider = state
            .providers
            .entry(name.to_string())
            .or_insert(provider);
        Ok(Some(Arc::clone(provider)))
    }

    /// The adapter named by `currentProvider`
    pub async fn current_provider(&self) -> Result<Arc<dyn Provider>> {
        let name = self.settings().await?.current_provider;
        self.get_provider(&name)
            .await?
            .ok_or(Error::NoProviderConfigured(name))
    }

    /// Generate one value for `field` with the active provider
    pub async fn generate_content(
        &self,
        field: &FieldInfo,
        params: GenerateParams,
    ) -> Result<GenerationResponse> {
        let provider = self.current_provider().await?;
        let settings = self.settings().await?;

        let creativity = clamp_creativity(
            params
                .creativity_level
                .unwrap_or_else(|| settings.creativity_for(&field.field_type)),
        );

        let request = GenerationRequest::new(field.clone(), creativity)
            .with_context(params.context)
            .with_page_context(params.page_context)
            .with_previous(params.previous_generations);

        debug!(
            "Generating {} with {} (creativity {})",
            field.signature,
            provider.name(),
            creativity
        );

        Ok(provider.generate_response(&request).await?)
    }

    /// `false` when the provider has no credential or the ping fails
    pub async fn test_connection(&self, name: &str) -> bool {
        match self.get_provider(name).await {
            Ok(Some(provider)) => provider.test_connection().await,
            Ok(None) => {
                debug!("No credential for '{}', connection test skipped", name);
                false
            }
            Err(e) => {
                warn!("Connection test for '{}' failed: {}", name, e);
                false
            }
        }
    }

    /// Models offered by `name`; falls back to the configured list when unconfigured
    pub async fn list_models(&self, name: &str) -> Result<Vec<String>> {
        if let Some(provider) = self.get_provider(name).await? {
            return Ok(provider.list_models().await);
        }
        let settings = self.settings().await?;
        Ok(provider_settings(&settings, name)
            .map(|p| p.models)
            .unwrap_or_default())
    }

    /// Snapshot of the settings in effect
    pub async fn settings(&self) -> Result<Settings> {
        self.ensure_initialized().await?;
        Ok(self.state.read().await.settings.clone())
    }

    /// Providers with a built adapter, sorted
    pub async fn loaded_providers(&self) -> Vec<String> {
        sorted_keys(&self.state.read().await.providers)
    }

    /// Whether the current provider has a credential
    pub async fn has_configured_provider(&self) -> bool {
        self.current_provider().await.is_ok()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

fn provider_settings(settings: &Settings, name: &str) -> Option<ProviderSettings> {
    settings
        .provider(name)
        .cloned()
        .or_else(|| ProviderKind::from_id(name).map(ProviderSettings::for_kind))
}

fn sorted_keys(providers: &HashMap<String, Arc<dyn Provider>>) -> Vec<String> {
    let mut names: Vec<String> = providers.keys().cloned().collect();
    names.sort();
    names
}
