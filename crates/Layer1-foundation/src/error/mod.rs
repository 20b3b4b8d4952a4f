//! Error types for Fillo
//!
//! 모든 에러를 중앙에서 관리. Provider 계층의 세부 에러는
//! `fillo_provider::ProviderError`에서 이 타입으로 변환된다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fillo 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    /// The backing medium cannot be opened or is not writable
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A query or write against an open store failed
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Provider 관련
    // ========================================================================
    /// The active provider has no credential
    #[error("No LLM provider configured for '{0}'. Please add an API key in settings.")]
    NoProviderConfigured(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Network failure, non-2xx response or timeout, tagged with the provider's display name
    #[error("{provider} generation failed: {message}")]
    Api { provider: String, message: String },

    /// The backend answered but produced no usable text
    #[error("{0} generation failed: empty response")]
    EmptyResponse(String),

    /// Generation failed and no similar cached entry could stand in
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자가 설정을 바꿔서 해결할 수 있는 에러인지 확인
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Error::NoProviderConfigured(_)
                | Error::ProviderNotFound(_)
                | Error::Config(_)
                | Error::Validation(_)
        )
    }

    /// 저장소 에러인지 확인
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::Storage(_) | Error::Sqlite(_)
        )
    }

    /// API 에러 생성 헬퍼
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
