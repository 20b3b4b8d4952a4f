//! Ollama provider implementation
//!
//! 로컬 Ollama 서버의 OpenAI 호환 엔드포인트(`/v1/chat/completions`)를 쓴다.
//! 인증 없음. 모델 목록은 네이티브 `/api/tags`에서 가져온다.

use super::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::{
    error::ProviderError,
    http::{build_client, endpoint, send_json},
    prompt::{build_prompt, MAX_TOKENS, PING_MAX_TOKENS, SYSTEM_PROMPT},
    r#trait::{GenerationRequest, Provider},
    registry::ProviderInit,
};
use async_trait::async_trait;
use fillo_foundation::ProviderKind;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const MIN_TEMPERATURE: f64 = 0.1;
const MAX_TEMPERATURE: f64 = 2.0;

/// Ollama local LLM provider
pub struct OllamaProvider {
    client: Client,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(init: ProviderInit) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(init.timeout)?,
            model: init.model,
            base_url: init.base_url,
            timeout: init.timeout,
        })
    }

    /// Server root for the native API (`http://host:11434`)
    fn native_base(&self) -> String {
        self.base_url.replacen("/v1", "", 1)
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, ProviderError> {
        let request = self
            .client
            .get(endpoint(&self.native_base(), "/api/tags"));
        send_json(request, self.timeout).await
    }

    /// Models installed on the server, or the static list if it cannot be reached
    pub async fn list_server_models(&self) -> Vec<String> {
        match self.fetch_tags().await {
            Ok(TagsResponse {
                models: Some(models),
            }) => models.into_iter().map(|m| m.name).collect(),
            Ok(_) => self.available_models(),
            Err(e) => {
                warn!("Failed to get Ollama models: {}", e);
                self.available_models()
            }
        }
    }

    async fn chat(&self, body: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        let request = self
            .client
            .post(endpoint(&self.base_url, "/chat/completions"))
            .json(body);
        send_json(request, self.timeout).await
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn id(&self) -> &str {
        ProviderKind::Ollama.id()
    }

    fn name(&self) -> &str {
        ProviderKind::Ollama.display_name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn available_models(&self) -> Vec<String> {
        ProviderKind::Ollama
            .models()
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    async fn list_models(&self) -> Vec<String> {
        self.list_server_models().await
    }

    /// Tags endpoint first, then a five-token chat
    async fn test_connection(&self) -> bool {
        match self.fetch_tags().await {
            Ok(TagsResponse { models: Some(_) }) => {}
            Ok(_) => return false,
            Err(e) => {
                warn!("Ollama connection test failed: {}", e);
                return false;
            }
        }

        let ping = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user("Hello")],
            max_tokens: PING_MAX_TOKENS,
            temperature: MIN_TEMPERATURE,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stream: None,
        };

        match self.chat(&ping).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Ollama connection test failed: {}", e);
                false
            }
        }
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_prompt(request)),
            ],
            max_tokens: MAX_TOKENS,
            temperature: request
                .creativity_level
                .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stream: Some(false),
        };
        debug!(
            "Ollama request: model={}, temperature={}",
            body.model, body.temperature
        );

        self.chat(&body).await?.into_content()
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Option<Vec<TagModel>>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::REQUEST_TIMEOUT;
    use fillo_foundation::FieldInfo;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(server_url: &str) -> OllamaProvider {
        OllamaProvider::new(ProviderInit {
            api_key: String::new(),
            base_url: format!("{}/v1", server_url),
            model: "llama2".to_string(),
            timeout: REQUEST_TIMEOUT,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_content_without_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({
                "model": "llama2",
                "stream": false,
                "max_tokens": 150
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Answer: 555-0134"}}]}"#)
            .create_async()
            .await;

        let request =
            GenerationRequest::new(FieldInfo::new("phone", "Phone", "Contact"), 0.1);
        let content = provider(&server.url())
            .generate_content(&request)
            .await
            .unwrap();
        assert_eq!(content, "555-0134");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_checks_tags_then_chat() {
        let mut server = mockito::Server::new_async().await;
        let tags = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama2:latest"}]}"#)
            .create_async()
            .await;
        let chat = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"max_tokens": 5})))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Hi"}}]}"#)
            .create_async()
            .await;

        assert!(provider(&server.url()).test_connection().await);
        tags.assert_async().await;
        chat.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_without_server_is_false() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(502)
            .create_async()
            .await;
        assert!(!provider(&server.url()).test_connection().await);
    }

    #[tokio::test]
    async fn test_list_server_models() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"mistral:7b"},{"name":"llama3:8b"}]}"#)
            .create_async()
            .await;
        assert_eq!(
            provider(&server.url()).list_server_models().await,
            vec!["mistral:7b", "llama3:8b"]
        );
    }

    #[tokio::test]
    async fn test_list_server_models_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/tags")
            .with_status(500)
            .create_async()
            .await;
        let models = provider(&server.url()).list_server_models().await;
        assert!(models.contains(&"llama2".to_string()));
    }
}
