//! Provider-specific error types
//!
//! ProviderError는 HTTP 레벨의 세부 에러를 분류합니다.
//! `fillo_foundation::Error`로 변환될 때 프로바이더 표시 이름이 붙습니다.

use fillo_foundation::Error as FoundationError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// The request did not finish within the client timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network error (connection failed, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found or not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The backend answered without usable text
    #[error("Empty response generated")]
    EmptyResponse,

    /// Provider not configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),

    /// Any of the above, tagged with the provider's display name
    #[error("{provider} generation failed: {source}")]
    Failed {
        provider: String,
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            429 => {
                // Try to extract retry-after from body
                let retry_after = extract_retry_after(body);
                ProviderError::RateLimited {
                    retry_after_ms: retry_after,
                }
            }
            400 | 422 => ProviderError::InvalidRequest(body.to_string()),
            404 => ProviderError::ModelNotAvailable(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Classify a transport error; timeouts keep their own variant
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        // URL에 쿼리 키가 실릴 수 있으므로 메시지에서 제외
        let err = err.without_url();
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }

    /// Tag with the provider display name (idempotent)
    pub fn tagged(self, provider: impl Into<String>) -> Self {
        match self {
            tagged @ ProviderError::Failed { .. } => tagged,
            other => ProviderError::Failed {
                provider: provider.into(),
                source: Box::new(other),
            },
        }
    }

    /// The untagged cause
    pub fn root(&self) -> &ProviderError {
        match self {
            ProviderError::Failed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), ProviderError::Timeout(_))
    }
}

/// Try to extract retry-after value from error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    // Try to find retry_after in JSON
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(secs) = json
            .get("error")
            .and_then(|e| e.get("retry_after"))
            .and_then(|v| v.as_f64())
        {
            return Some((secs * 1000.0) as u64);
        }
    }

    // Try to find in plain text
    if let Some(idx) = body.find("retry") {
        let after = &body[idx..];
        let num_str: String = after
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        if let Ok(secs) = num_str.parse::<f64>() {
            return Some((secs * 1000.0) as u64);
        }
    }

    None
}

// ============================================================================
// fillo_foundation::Error 변환
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Failed { provider, source } => match *source {
                ProviderError::EmptyResponse => FoundationError::EmptyResponse(provider),
                ProviderError::NotConfigured(_) => FoundationError::NoProviderConfigured(provider),
                other => FoundationError::Api {
                    provider,
                    message: other.to_string(),
                },
            },
            ProviderError::EmptyResponse => FoundationError::EmptyResponse("unknown".to_string()),
            ProviderError::NotConfigured(name) => FoundationError::NoProviderConfigured(name),
            other => FoundationError::Api {
                provider: "unknown".to_string(),
                message: other.to_string(),
            },
        }
    }
}
