//! Google Gemini provider implementation (generateContent)

use crate::{
    error::ProviderError,
    http::{build_client, endpoint, send_json},
    prompt::{build_prompt, clean_response, MAX_TOKENS, PING_MAX_TOKENS, SYSTEM_PROMPT},
    r#trait::{GenerationRequest, Provider},
    registry::ProviderInit,
};
use async_trait::async_trait;
use fillo_foundation::ProviderKind;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const MIN_TEMPERATURE: f64 = 0.1;
const MAX_TEMPERATURE: f64 = 2.0;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(init: ProviderInit) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(init.timeout)?,
            api_key: init.api_key,
            model: init.model,
            base_url: init.base_url,
            timeout: init.timeout,
        })
    }

    /// The key travels as a query parameter
    fn generate_request(&self, body: &GenerateContentRequest) -> RequestBuilder {
        let path = format!("/models/{}:generateContent", self.model);
        self.client
            .post(endpoint(&self.base_url, &path))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> &str {
        ProviderKind::Google.id()
    }

    fn name(&self) -> &str {
        ProviderKind::Google.display_name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn available_models(&self) -> Vec<String> {
        ProviderKind::Google
            .models()
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    async fn test_connection(&self) -> bool {
        let body = GenerateContentRequest {
            contents: vec![Content::text("Hello")],
            generation_config: GenerationConfig {
                max_output_tokens: PING_MAX_TOKENS,
                temperature: None,
                top_p: None,
                top_k: None,
            },
            safety_settings: Vec::new(),
        };

        match send_json::<ProbeResponse>(self.generate_request(&body), self.timeout).await {
            Ok(reply) => reply.candidates.is_some(),
            Err(e) => {
                warn!("Google connection test failed: {}", e);
                false
            }
        }
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let temperature = request
            .creativity_level
            .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
        let prompt = format!("{}\n\n{}", SYSTEM_PROMPT, build_prompt(request));
        let body = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_TOKENS,
                temperature: Some(temperature),
                top_p: Some(1.0),
                top_k: Some(1),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: *category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
        };
        debug!(
            "Google request: model={}, temperature={}",
            self.model, temperature
        );

        let response: GenerateContentResponse =
            send_json(self.generate_request(&body), self.timeout).await?;

        let raw = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();

        let content = clean_response(&raw);
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(content)
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    candidates: Option<Vec<serde_json::Value>>,
}
