//! Credential resolution
//!
//! API 키는 설정 파일에 저장하지 않는다. 코어는 `CredentialSource`에서
//! 이미 해석된 키 문자열만 받는다.
//!
//! - `JsonCredentialStore`: credentials.json (사용자가 입력한 키)
//! - `EnvCredentials`: OPENAI_API_KEY 등 환경변수
//! - `ChainedCredentials`: 여러 소스를 순서대로 조회

use super::ProviderKind;
use crate::storage::JsonStore;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Resolves a provider name to its API key
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// `None` when no (non-empty) key is stored
    async fn get_api_key(&self, provider: &str) -> Result<Option<String>>;
}

fn non_empty(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

// ============================================================================
// JSON 파일
// ============================================================================

/// Keys kept in `credentials.json` next to the settings file
#[derive(Debug, Clone)]
pub struct JsonCredentialStore {
    store: JsonStore,
}

impl JsonCredentialStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    fn load_all(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .store
            .load_optional::<BTreeMap<String, String>>(CREDENTIALS_FILE)?
            .unwrap_or_default())
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<()> {
        let mut all = self.load_all()?;
        all.insert(provider.to_string(), key.to_string());
        self.store.save(CREDENTIALS_FILE, &all)
    }

    pub fn remove_api_key(&self, provider: &str) -> Result<()> {
        let mut all = self.load_all()?;
        if all.remove(provider).is_some() {
            self.store.save(CREDENTIALS_FILE, &all)?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialSource for JsonCredentialStore {
    async fn get_api_key(&self, provider: &str) -> Result<Option<String>> {
        let store = self.clone();
        let provider = provider.to_string();
        let all = tokio::task::spawn_blocking(move || store.load_all())
            .await
            .map_err(|e| Error::Internal(format!("Credential lookup task failed: {}", e)))??;
        Ok(non_empty(all.get(&provider).cloned()))
    }
}

// ============================================================================
// 환경변수
// ============================================================================

/// Keys from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

#[async_trait]
impl CredentialSource for EnvCredentials {
    async fn get_api_key(&self, provider: &str) -> Result<Option<String>> {
        let Some(kind) = ProviderKind::from_id(provider) else {
            return Ok(None);
        };
        Ok(kind
            .env_vars()
            .iter()
            .find_map(|var| non_empty(std::env::var(var).ok())))
    }
}

// ============================================================================
// 체인
// ============================================================================

/// First source with a key wins
#[derive(Clone, Default)]
pub struct ChainedCredentials {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl ChainedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.sources.push(source);
        self
    }
}

#[async_trait]
impl CredentialSource for ChainedCredentials {
    async fn get_api_key(&self, provider: &str) -> Result<Option<String>> {
        for source in &self.sources {
            if let Some(key) = source.get_api_key(provider).await? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }
}

// ============================================================================
// 메모리 (테스트, 임베딩 호스트)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
    keys: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, provider: &str, key: &str) -> Self {
        self.set(provider, key);
        self
    }

    pub fn set(&self, provider: &str, key: &str) {
        self.keys
            .write()
            .insert(provider.to_string(), key.to_string());
    }

    pub fn remove(&self, provider: &str) {
        self.keys.write().remove(provider);
    }
}

#[async_trait]
impl CredentialSource for MemoryCredentials {
    async fn get_api_key(&self, provider: &str) -> Result<Option<String>> {
        Ok(non_empty(self.keys.read().get(provider).cloned()))
    }
}
