//! Core Module - 공용 타입
//!
//! 모든 레이어가 공유하는 필드/페이지 기술자.
//!
//! - `types.rs`: FieldInfo, PageContext, FormFieldState

mod types;

pub use types::{signature_for, FieldInfo, FormFieldState, PageContext};
