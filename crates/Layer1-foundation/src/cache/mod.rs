//! # Fillo Cache
//!
//! 생성 결과 캐시. 같은 필드(시그니처)와 비슷한 창의성 레벨의 요청은
//! API를 다시 호출하지 않고 저장된 결과를 돌려준다.
//!
//! ```text
//! ContentGenerator
//!        │
//!        ▼
//!  CacheManager  ── tolerance 0.1 (get) / 0.2 (by type), hit/miss 카운터
//!        │
//!        ▼
//!  CacheStore (SQLite) ── cache_entries, cache_counters
//! ```

mod manager;

pub use manager::{
    CacheManager, CacheStats, CacheWrite, DEFAULT_EXPIRATION_DAYS, DEFAULT_MAX_ENTRIES,
    DEFAULT_SIMILAR_LIMIT, DEFAULT_TYPE_LIMIT, GET_TOLERANCE, TYPE_TOLERANCE,
};
