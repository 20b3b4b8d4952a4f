//! In-memory generation history
//!
//! 필드 시그니처별로 최근 생성값을 보관한다. 호출자가 이전 값을 넘기지 않으면
//! 이 기록이 프롬프트의 "피해야 할 값" 목록이 된다.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Distinct values kept per signature
pub const MAX_HISTORY_PER_FIELD: usize = 10;

/// Values handed to the provider when the caller gives none
pub const RECENT_FOR_PROMPT: usize = 5;

#[derive(Debug, Default)]
pub struct GenerationHistory {
    entries: Mutex<HashMap<String, VecDeque<String>>>,
}

impl GenerationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `content`; a repeated value moves to the front
    pub fn record(&self, signature: &str, content: &str) {
        let mut entries = self.entries.lock();
        let values = entries.entry(signature.to_string()).or_default();
        values.retain(|v| v != content);
        values.push_front(content.to_string());
        values.truncate(MAX_HISTORY_PER_FIELD);
    }

    /// Up to `limit` values, newest first
    pub fn recent(&self, signature: &str, limit: usize) -> Vec<String> {
        self.entries
            .lock()
            .get(signature)
            .map(|values| values.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
