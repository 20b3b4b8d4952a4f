//! Storage module for Fillo
//!
//! - `db`: SQLite - 생성 결과 캐시 (cache_entries, 카운터)
//! - `json`: JSON - 설정/자격증명 파일

mod db;
mod json;

// SQLite Storage (캐시)
pub use db::{
    base_signature, creativity_bucket, CacheEntry, CacheStore, CleanupReport, NewCacheEntry,
    StoreStats,
};

// JSON Storage (설정)
pub use json::JsonStore;
