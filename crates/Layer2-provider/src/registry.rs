//! Provider registry
//!
//! 프로바이더 이름 → 어댑터 팩토리. 새 백엔드는 어댑터 하나를 작성하고
//! 여기에 팩토리 하나를 등록하면 된다.

use crate::error::ProviderError;
use crate::http::REQUEST_TIMEOUT;
use crate::providers::{AnthropicProvider, GeminiProvider, OllamaProvider, OpenAiProvider};
use crate::r#trait::Provider;
use fillo_foundation::ProviderKind;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Resolved inputs for building one adapter
#[derive(Debug, Clone)]
pub struct ProviderInit {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ProviderInit {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Builds an adapter from resolved settings and credential
pub type ProviderFactory =
    Arc<dyn Fn(ProviderInit) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync>;

/// Name → factory table
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// OpenAI, Anthropic, Google and Ollama
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderKind::Openai.id(), |init| {
            Ok(Arc::new(OpenAiProvider::new(init)?) as Arc<dyn Provider>)
        });
        registry.register(ProviderKind::Anthropic.id(), |init| {
            Ok(Arc::new(AnthropicProvider::new(init)?) as Arc<dyn Provider>)
        });
        registry.register(ProviderKind::Google.id(), |init| {
            Ok(Arc::new(GeminiProvider::new(init)?) as Arc<dyn Provider>)
        });
        registry.register(ProviderKind::Ollama.id(), |init| {
            Ok(Arc::new(OllamaProvider::new(init)?) as Arc<dyn Provider>)
        });
        registry
    }

    /// Add or replace a factory
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(ProviderInit) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn build(&self, name: &str, init: ProviderInit) -> Result<Arc<dyn Provider>, ProviderError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProviderError::NotConfigured(format!("Unknown provider: {}", name)))?;
        factory(init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = ProviderRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["anthropic", "google", "ollama", "openai"]
        );

        let provider = registry
            .build(
                "google",
                ProviderInit::new("key", "http://localhost:1", "gemini-1.5-flash"),
            )
            .unwrap();
        assert_eq!(provider.id(), "google");
        assert_eq!(provider.name(), "Google");
        assert_eq!(provider.model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::with_builtins();
        let result = registry.build("groq", ProviderInit::new("k", "http://x", "m"));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
