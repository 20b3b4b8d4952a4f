//! # fillo-foundation
//!
//! Foundation layer for Fillo:
//! - Core: 폼 필드 기술자, 페이지 컨텍스트
//! - Settings: 프로바이더/창의성/캐시 설정, 검증, 자격증명
//! - Storage: SQLite (캐시 레코드), JsonStore (설정 파일)
//! - Cache: 조회 정책과 히트/미스 통계
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  fillo-generator (ContentGenerator)                     │
//! │          │                         │                    │
//! │          ▼                         ▼                    │
//! │  CacheManager              fillo-provider               │
//! │          │                 (ProviderManager)            │
//! │          ▼                         │                    │
//! │  CacheStore (SQLite)       Settings + CredentialSource  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod clock;
pub mod core;
pub mod error;
pub mod settings;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (공용 타입)
// ============================================================================
pub use core::{signature_for, FieldInfo, FormFieldState, PageContext};

// ============================================================================
// Clock
// ============================================================================
pub use clock::{Clock, ManualClock, SystemClock};

// ============================================================================
// Settings (설정)
// ============================================================================
pub use settings::{
    // Creativity
    creativity::{clamp_creativity, preset_for_temperature, temperature_label},
    CreativityPreset,
    // Credentials
    ChainedCredentials,
    CredentialSource,
    EnvCredentials,
    JsonCredentialStore,
    MemoryCredentials,
    // Settings
    CacheSettings,
    CreativitySettings,
    JsonSettingsSource,
    ProviderKind,
    ProviderSettings,
    Settings,
    SettingsSource,
    StaticSettings,
    SETTINGS_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    // JSON (설정)
    JsonStore,
    // SQLite (캐시)
    CacheEntry,
    CacheStore,
    CleanupReport,
    NewCacheEntry,
    StoreStats,
};

// ============================================================================
// Cache (캐시 정책)
// ============================================================================
pub use cache::{CacheManager, CacheStats, CacheWrite};
