//! Core Types - 공용 타입 정의
//!
//! 필드 탐지(content script)가 만들어 넘겨주는 기술자들.
//! 코어는 이 값을 해석만 하고 생성하지 않는다.

use serde::{Deserialize, Serialize};

// ============================================================================
// FieldInfo - 폼 필드 기술자
// ============================================================================

/// A detected form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    /// Semantic category ("email", "name", "textarea", ...)
    #[serde(rename = "type")]
    pub field_type: String,

    /// Visible label text
    pub label: String,

    /// Surrounding form context (legend, heading, form name)
    #[serde(default)]
    pub context: String,

    /// Cache key, see [`signature_for`]
    pub signature: String,
}

impl FieldInfo {
    /// Build a descriptor and derive its signature
    pub fn new(
        field_type: impl Into<String>,
        label: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let field_type = field_type.into();
        let label = label.into();
        let context = context.into();
        let signature = signature_for(&field_type, &label, &context);
        Self {
            field_type,
            label,
            context,
            signature,
        }
    }

    /// Use a caller-derived signature as is
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }
}

/// `{type}-{label}-{context}`, lower-cased, whitespace runs collapsed to `-`.
///
/// Similarity lookup drops the last `-` segment of this key to find related
/// fields, so the three parts are joined with plain hyphens.
pub fn signature_for(field_type: &str, label: &str, context: &str) -> String {
    format!("{}-{}-{}", field_type, label, context)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

// ============================================================================
// PageContext - 프롬프트 보강용 페이지 정보
// ============================================================================

/// Page information used only to enrich prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub title: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_purpose: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form_fields: Vec<FormFieldState>,
}

/// Current value of another field on the same form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldState {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub value: String,
}
