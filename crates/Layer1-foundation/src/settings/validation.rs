//! Settings validation
//!
//! 저장 전에 설정값을 검사한다. 모든 문제를 모아서 한 번에 돌려준다.

use super::creativity::{MAX_CREATIVITY, MIN_CREATIVITY};
use super::{ProviderKind, Settings};
use url::Url;

pub const MIN_CACHE_ENTRIES: u32 = 100;
pub const MAX_CACHE_ENTRIES: u32 = 100_000;
pub const MIN_EXPIRATION_DAYS: u32 = 1;
pub const MAX_EXPIRATION_DAYS: u32 = 365;

impl Settings {
    /// Check every field, collecting one message per problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if ProviderKind::from_id(&self.current_provider).is_none()
            && !self.providers.contains_key(&self.current_provider)
        {
            errors.push(format!("Unknown provider: {}", self.current_provider));
        }

        if !valid_temperature(self.creativity.level) {
            errors.push(format!(
                "Temperature must be between {} and {}",
                MIN_CREATIVITY, MAX_CREATIVITY
            ));
        }

        for (field_type, level) in &self.creativity.field_specific {
            if !valid_temperature(*level) {
                errors.push(format!(
                    "Invalid temperature for field type {}: {}",
                    field_type, level
                ));
            }
        }

        if !(MIN_CACHE_ENTRIES..=MAX_CACHE_ENTRIES).contains(&self.cache.max_entries) {
            errors.push(format!(
                "Max cache entries must be between {} and {}",
                MIN_CACHE_ENTRIES, MAX_CACHE_ENTRIES
            ));
        }

        if !(MIN_EXPIRATION_DAYS..=MAX_EXPIRATION_DAYS).contains(&self.cache.expiration_days) {
            errors.push(format!(
                "Cache expiration must be between {} and {} days",
                MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS
            ));
        }

        for (name, provider) in &self.providers {
            if !valid_url(&provider.base_url) {
                errors.push(format!("Invalid base URL for {}", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn valid_temperature(level: f64) -> bool {
    level.is_finite() && (MIN_CREATIVITY..=MAX_CREATIVITY).contains(&level)
}

fn valid_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Shape check for an API key before it is stored
pub fn validate_api_key(provider: &str, key: &str) -> Result<(), String> {
    let ok = match ProviderKind::from_id(provider) {
        Some(ProviderKind::Openai) => key.starts_with("sk-") && key.len() >= 40,
        Some(ProviderKind::Anthropic) => key.starts_with("sk-ant-") && key.len() >= 40,
        Some(ProviderKind::Google) => {
            key.len() >= 30
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        Some(ProviderKind::Ollama) => true,
        None => !key.is_empty(),
    };

    if ok {
        Ok(())
    } else {
        Err(format!("Invalid API key format for {}", provider))
    }
}
