//! Provider trait and common types
//!
//! ## 타입 의존성
//!
//! - `FieldInfo`, `PageContext`: Layer1-foundation에서 re-export (필드 기술자)
//! - `GenerationRequest`, `GenerationResponse`: 이 레이어 고유 정의

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use fillo_foundation::{FieldInfo, PageContext};

/// Everything an adapter needs to produce one field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub field_info: FieldInfo,

    /// Requested level; each adapter clamps it to its backend's range
    pub creativity_level: f64,

    /// Free-text context from the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_context: Option<PageContext>,

    /// Values already produced for this field, to steer away from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_generations: Vec<String>,
}

impl GenerationRequest {
    pub fn new(field_info: FieldInfo, creativity_level: f64) -> Self {
        Self {
            field_info,
            creativity_level,
            context: None,
            page_context: None,
            previous_generations: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_page_context(mut self, page_context: Option<PageContext>) -> Self {
        self.page_context = page_context;
        self
    }

    pub fn with_previous(mut self, previous: Vec<String>) -> Self {
        self.previous_generations = previous;
        self
    }
}

/// Generated value plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub content: String,

    /// Provider display name ("OpenAI", "Anthropic", ...)
    pub provider: String,

    pub model: String,

    pub creativity_level: f64,

    /// Served from the cache instead of a fresh call
    pub cached: bool,
}

/// LLM Provider trait
///
/// Implement this trait (and register a factory in
/// [`ProviderRegistry`](crate::ProviderRegistry)) to add a backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Settings key ("openai", "google", ...)
    fn id(&self) -> &str;

    /// Display name used in responses and errors
    fn name(&self) -> &str;

    /// Selected model
    fn model(&self) -> &str;

    /// Models this backend is known to offer
    fn available_models(&self) -> Vec<String>;

    /// Models reported by the backend itself; defaults to the static list
    async fn list_models(&self) -> Vec<String> {
        self.available_models()
    }

    /// Cheap request proving the credential and endpoint work; never errors
    async fn test_connection(&self) -> bool;

    /// One completion, cleaned of quotes and boilerplate prefixes
    async fn generate_content(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// [`generate_content`](Provider::generate_content) wrapped into a response
    ///
    /// Errors come back as [`ProviderError::Failed`] carrying [`name`](Provider::name).
    async fn generate_response(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        match self.generate_content(request).await {
            Ok(content) => Ok(GenerationResponse {
                content: content.trim().to_string(),
                provider: self.name().to_string(),
                model: self.model().to_string(),
                creativity_level: request.creativity_level,
                cached: false,
            }),
            Err(e) => {
                let err = e.tagged(self.name());
                warn!("{}", err);
                Err(err)
            }
        }
    }
}
