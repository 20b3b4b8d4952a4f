//! Component wiring
//!
//! 설정/자격증명 파일, SQLite 캐시, 프로바이더 매니저를 한 번 만들고
//! `Arc`로 공유한다.

use fillo_foundation::{
    CacheManager, CacheStore, ChainedCredentials, EnvCredentials, JsonCredentialStore,
    JsonSettingsSource, JsonStore, Result,
};
use fillo_generator::ContentGenerator;
use fillo_provider::{ProviderManager, ProviderRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct App {
    pub generator: Arc<ContentGenerator>,
    pub settings: JsonSettingsSource,
    pub credentials: JsonCredentialStore,
}

impl App {
    pub fn open(config_dir: Option<PathBuf>, cache_db: Option<PathBuf>) -> Result<Self> {
        let store = match config_dir {
            Some(dir) => JsonStore::new(dir),
            None => JsonStore::global()?,
        };
        let cache_path = match cache_db {
            Some(path) => path,
            None => JsonStore::default_cache_path()?,
        };
        debug!(
            "Config dir: {}, cache: {}",
            store.base_dir().display(),
            cache_path.display()
        );

        let settings = JsonSettingsSource::new(store.clone());
        let credentials = JsonCredentialStore::new(store);

        // 파일에 저장된 키가 환경변수보다 우선
        let chain = ChainedCredentials::new()
            .with(Arc::new(credentials.clone()))
            .with(Arc::new(EnvCredentials));

        let providers = Arc::new(ProviderManager::new(
            Arc::new(settings.clone()),
            Arc::new(chain),
            ProviderRegistry::with_builtins(),
        ));
        let cache = CacheManager::new(CacheStore::open(&cache_path)?);

        Ok(Self {
            generator: Arc::new(ContentGenerator::new(cache, providers)),
            settings,
            credentials,
        })
    }
}
