use serde::{Deserialize, Serialize};

/// 내장 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Anthropic,
    Google,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Openai,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Ollama,
    ];

    /// 설정 키 ("openai", "anthropic", ...)
    pub fn id(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Ollama => "ollama",
        }
    }

    /// 표시 이름
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Openai => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google",
            Self::Ollama => "Ollama",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// 로컬 서비스 여부 (인증 없음)
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }

    /// 기본 Base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Openai => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Google => "https://generativelanguage.googleapis.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    /// 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Openai => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
            Self::Google => "gemini-1.5-flash",
            Self::Ollama => "llama2",
        }
    }

    /// 선택 가능한 모델 목록
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Self::Openai => &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "gpt-4o", "gpt-4o-mini"],
            Self::Anthropic => &[
                "claude-3-haiku-20240307",
                "claude-3-sonnet-20240229",
                "claude-3-opus-20240229",
                "claude-3-5-sonnet-20241022",
            ],
            Self::Google => &["gemini-pro", "gemini-1.5-pro", "gemini-1.5-flash"],
            Self::Ollama => &[
                "llama2",
                "llama2:13b",
                "codellama",
                "mistral",
                "mixtral",
                "neural-chat",
                "starling-lm",
            ],
        }
    }

    /// API 키를 찾을 환경변수 (앞쪽이 우선)
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Openai => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::Google => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::Ollama => &["OLLAMA_API_KEY"],
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id_round_trips() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ProviderKind::from_id("groq"), None);
    }

    #[test]
    fn test_default_model_is_listed() {
        for kind in ProviderKind::ALL {
            assert!(kind.models().contains(&kind.default_model()), "{}", kind);
        }
    }
}
