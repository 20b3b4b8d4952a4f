//! Anthropic Claude provider implementation (messages API)

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

const API_VERSION: &str = "2023-06-01";
const MIN_TEMPERATURE: f64 = 0.1;
const MAX_TEMPERATURE: f64 = 1.0;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(init: ProviderInit) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(init.timeout)?,
            api_key: init.api_key,
            model: init.model,
            base_url: init.base_url,
            timeout: init.timeout,
        })
    }

    fn messages_request(&self, body: &MessagesRequest<'_>) -> RequestBuilder {
        self.client
            .post(endpoint(&self.base_url, "/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn id(&self) -> &str {
        ProviderKind::Anthropic.id()
    }

    fn name(&self) -> &str {
        ProviderKind::Anthropic.display_name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn available_models(&self) -> Vec<String> {
        ProviderKind::Anthropic
            .models()
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    async fn test_connection(&self) -> bool {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: PING_MAX_TOKENS,
            temperature: None,
            system: None,
            messages: vec![UserMessage::new("Hello")],
        };

        match send_json::<ProbeResponse>(self.messages_request(&body), self.timeout).await {
            Ok(reply) => reply.content.is_some(),
            Err(e) => {
                warn!("Anthropic connection test failed: {}", e);
                false
            }
        }
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let temperature = request
            .creativity_level
            .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: Some(temperature),
            system: Some(SYSTEM_PROMPT),
            messages: vec![UserMessage::new(build_prompt(request))],
        };
        debug!(
            "Anthropic request: model={}, temperature={}",
            self.model, temperature
        );

        let response: MessagesResponse =
            send_json(self.messages_request(&body), self.timeout).await?;

        let raw = response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
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
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<UserMessage>,
}

#[derive(Debug, Serialize)]
struct UserMessage {
    role: &'static str,
    content: String,
}

impl UserMessage {
    fn new(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Only checks that `content` is an array
#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    content: Option<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::REQUEST_TIMEOUT;
    use fillo_foundation::FieldInfo;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new(ProviderInit {
            api_key: "sk-ant-test".to_string(),
            base_url: base_url.to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            timeout: REQUEST_TIMEOUT,
        })
        .unwrap()
    }

    fn request(level: f64) -> GenerationRequest {
        GenerationRequest::new(FieldInfo::new("bio", "About you", "Profile"), level)
    }

    #[tokio::test]
    async fn test_generate_content_clamps_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 150,
                "temperature": 1.0,
                "system": SYSTEM_PROMPT
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Field content: I build bridges."}]}"#)
            .create_async()
            .await;

        let content = provider(&server.url())
            .generate_content(&request(1.8))
            .await
            .unwrap();
        assert_eq!(content, "I build bridges.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"   "}]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_response(&request(0.7))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Anthropic generation failed: Empty response generated");
    }

    #[tokio::test]
    async fn test_auth_failure_names_provider() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body("invalid x-api-key")
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_response(&request(0.7))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Anthropic generation failed: Authentication failed: invalid x-api-key"
        );
    }

    #[tokio::test]
    async fn test_connection_ping() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/messages")
            .match_body(Matcher::PartialJson(json!({"max_tokens": 5})))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Hi"}]}"#)
            .create_async()
            .await;
        assert!(provider(&server.url()).test_connection().await);

        let mut bad = mockito::Server::new_async().await;
        let _m = bad
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"type":"error"}"#)
            .create_async()
            .await;
        assert!(!provider(&bad.url()).test_connection().await);
    }
}
