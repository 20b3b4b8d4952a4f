//! # fillo-generator
//!
//! Cache-aware content generation for Fillo.
//! 캐시 조회 → 프로바이더 호출 → 캐시 저장, 실패 시 비슷한 캐시로 대체.
//!
//! ## 구성
//! - `ContentGenerator`: 단일 진입점 (`generate_for_field`)
//! - `GenerationHistory`: 필드별 최근 생성값 (중복 회피용)
//! - `MaintenanceTask`: 주기적 캐시 정리

pub mod generator;
pub mod history;
pub mod maintenance;
pub mod options;

pub use generator::{ContentGenerator, VARIANT_CREATIVITY_STEP};
pub use history::{GenerationHistory, MAX_HISTORY_PER_FIELD, RECENT_FOR_PROMPT};
pub use maintenance::{MaintenanceTask, DEFAULT_MAINTENANCE_INTERVAL};
pub use options::{GenerateOptions, MultipleOptions};

// Re-exports for hosts
pub use fillo_foundation::{CacheStats, CleanupReport, FieldInfo, PageContext};
pub use fillo_provider::GenerationResponse;
