//! # fillo-provider
//!
//! LLM provider layer for Fillo.
//! 하나의 `Provider` 트레이트 뒤에 여러 백엔드를 둔다.
//!
//! ## Features
//! - OpenAI, Anthropic, Google Gemini, Ollama adapters
//! - Shared prompt construction and response cleanup
//! - Name → factory registry for adding backends
//! - `ProviderManager` that picks the active adapter from settings

pub mod error;
pub mod http;
pub mod manager;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod r#trait;

// Core traits and types
pub use r#trait::{FieldInfo, GenerationRequest, GenerationResponse, PageContext, Provider};

// Error
pub use error::ProviderError;

// Registry and manager
pub use manager::{GenerateParams, ProviderManager};
pub use registry::{ProviderFactory, ProviderInit, ProviderRegistry};

// Provider implementations
pub use providers::anthropic::AnthropicProvider;
pub use providers::gemini::GeminiProvider;
pub use providers::ollama::OllamaProvider;
pub use providers::openai::OpenAiProvider;
