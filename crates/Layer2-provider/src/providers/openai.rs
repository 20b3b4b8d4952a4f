//! OpenAI provider implementation (chat completions)

use crate::{
    error::ProviderError,
    http::{build_client, endpoint, send_json},
    prompt::{build_prompt, clean_response, MAX_TOKENS, SYSTEM_PROMPT},
    r#trait::{GenerationRequest, Provider},
    registry::ProviderInit,
};
use async_trait::async_trait;
use fillo_foundation::ProviderKind;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const MIN_TEMPERATURE: f64 = 0.1;
const MAX_TEMPERATURE: f64 = 2.0;

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(init: ProviderInit) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(init.timeout)?,
            api_key: init.api_key,
            model: init.model,
            base_url: init.base_url,
            timeout: init.timeout,
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_prompt(request)),
            ],
            max_tokens: MAX_TOKENS,
            temperature: request.creativity_level.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            top_p: Some(1.0),
            frequency_penalty: Some(0.0),
            presence_penalty: Some(0.0),
            stream: None,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> &str {
        ProviderKind::Openai.id()
    }

    fn name(&self) -> &str {
        ProviderKind::Openai.display_name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn available_models(&self) -> Vec<String> {
        ProviderKind::Openai
            .models()
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    async fn test_connection(&self) -> bool {
        let request = self
            .client
            .get(endpoint(&self.base_url, "/models"))
            .bearer_auth(&self.api_key);

        match send_json::<ModelList>(request, self.timeout).await {
            Ok(list) => !list.data.is_empty(),
            Err(e) => {
                warn!("OpenAI connection test failed: {}", e);
                false
            }
        }
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = self.build_request(request);
        debug!(
            "OpenAI request: model={}, temperature={}",
            body.model, body.temperature
        );

        let http = self
            .client
            .post(endpoint(&self.base_url, "/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body);

        let response: ChatCompletionResponse = send_json(http, self.timeout).await?;
        response.into_content()
    }
}

// ============================================================================
// Chat completions wire format (shared with Ollama's OpenAI-compatible API)
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice's text, cleaned; `EmptyResponse` when there is none
    pub fn into_content(self) -> Result<String, ProviderError> {
        let raw = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        let content = clean_response(&raw);
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(content)
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::REQUEST_TIMEOUT;
    use fillo_foundation::FieldInfo;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(ProviderInit {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: REQUEST_TIMEOUT,
        })
        .unwrap()
    }

    fn request(level: f64) -> GenerationRequest {
        GenerationRequest::new(FieldInfo::new("name", "Full Name", "Profile"), level)
    }

    #[tokio::test]
    async fn test_generate_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 150,
                "temperature": 2.0,
                "top_p": 1.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"\"Jane Doe\""}}]}"#)
            .create_async()
            .await;

        let content = provider(&server.url())
            .generate_content(&request(2.5))
            .await
            .unwrap();
        assert_eq!(content, "Jane Doe");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_content(&request(0.7))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_generate_response_tags_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_response(&request(0.7))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "OpenAI generation failed: Server error: upstream exploded"
        );
    }

    #[tokio::test]
    async fn test_generate_response_shape() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Content: Ada Lovelace"}}]}"#)
            .create_async()
            .await;

        let response = provider(&server.url())
            .generate_response(&request(0.3))
            .await
            .unwrap();
        assert_eq!(response.content, "Ada Lovelace");
        assert_eq!(response.provider, "OpenAI");
        assert_eq!(response.model, "gpt-4o-mini");
        assert_eq!(response.creativity_level, 0.3);
        assert!(!response.cached);
    }

    #[tokio::test]
    async fn test_connection() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/models")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"data":[{"id":"gpt-4o-mini"}]}"#)
            .create_async()
            .await;
        assert!(provider(&server.url()).test_connection().await);

        let mut empty = mockito::Server::new_async().await;
        let _m = empty
            .mock("GET", "/models")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;
        assert!(!provider(&empty.url()).test_connection().await);
    }

    #[tokio::test]
    async fn test_connection_failure_is_false() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/models")
            .with_status(401)
            .create_async()
            .await;
        assert!(!provider(&server.url()).test_connection().await);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // 연결은 받지만 응답하지 않는 서버
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let openai = OpenAiProvider::new(ProviderInit {
            api_key: "sk-test".to_string(),
            base_url: format!("http://{}", addr),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let err = openai.generate_response(&request(0.7)).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "OpenAI generation failed: Request timed out after 200ms"
        );
    }
}
