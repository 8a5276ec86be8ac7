//! Chat-completion client for the pitch generator.
//!
//! Provides a `CompletionBackend` trait with one implementation:
//! - **OpenAI-compatible** — a single POST to a `/chat/completions` endpoint
//!   (Groq by default) with bearer-token auth.
//!
//! Calls are made exactly once. There is no retry and, unless configured, no
//! timeout.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// Abstraction over chat-completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `prompt` as a single user message and return the text content of
    /// the first choice.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Option<Duration>,
}

impl CompletionConfig {
    /// Build from the `[llm]` section, reading the API key from the
    /// environment once.
    pub fn from_llm_config(llm: &LlmConfig) -> Self {
        Self {
            api_key: llm.api_key(),
            api_url: llm.api_url.clone(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            timeout: llm.timeout_seconds.map(Duration::from_secs),
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// ChatCompletionClient
// ============================================================================

/// Client for OpenAI-compatible chat-completion endpoints.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl ChatCompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if self.config.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
        };

        tracing::debug!(model = %self.config.model, url = %self.config.api_url, "Sending completion request");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(CompletionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;

        let first = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("no choices returned".to_string()))?;

        first.message.content.ok_or_else(|| {
            CompletionError::MalformedResponse("first choice has no message content".to_string())
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn name(&self) -> &str {
        "chat-completion"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

    fn test_config(server: &MockServer, api_key: &str) -> CompletionConfig {
        CompletionConfig {
            api_key: api_key.to_string(),
            api_url: format!("{}{}", server.uri(), COMPLETIONS_PATH),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.8,
            timeout: None,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
            ]
        })
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_returns_first_choice() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server, "test-key")).unwrap();

        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "model": "llama3-8b-8192",
                "messages": [{ "role": "user", "content": "hello" }],
                "temperature": 0.8
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("{\"pitch\":\"p\"}")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let content = client.complete("hello").await.unwrap();
        assert_eq!(content, "{\"pitch\":\"p\"}");
    }

    #[tokio::test]
    async fn test_complete_reports_api_error_message() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server, "bad-key")).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid API Key", "type": "invalid_request_error", "code": "invalid_api_key" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete("hello").await {
            Err(CompletionError::Api { code, message }) => {
                assert_eq!(code, 401);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_does_not_retry_on_server_error() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server, "test-key")).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete("hello").await {
            Err(CompletionError::Api { code, message }) => {
                assert_eq!(code, 503);
                assert_eq!(message, "upstream overloaded");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server, "test-key")).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&mock_server)
            .await;

        let result = client.complete("hello").await;
        assert!(matches!(result, Err(CompletionError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_complete_rejects_null_content() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server, "test-key")).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }]
            })))
            .mount(&mock_server)
            .await;

        let result = client.complete("hello").await;
        assert!(matches!(result, Err(CompletionError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_on_first_use() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server, ""))
            .expect("construction does not validate the key");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("{}")))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = client.complete("hello").await;
        assert!(matches!(result, Err(CompletionError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_transport_error_is_http_error() {
        let config = CompletionConfig {
            api_key: "test-key".to_string(),
            api_url: "http://127.0.0.1:1/openai/v1/chat/completions".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.8,
            timeout: Some(Duration::from_secs(5)),
        };
        let client = ChatCompletionClient::new(config).unwrap();

        let result = client.complete("hello").await;
        assert!(matches!(result, Err(CompletionError::Http(_))));
    }

    #[test]
    fn test_from_llm_config_copies_settings() {
        let llm = LlmConfig {
            api_key_env: "PITCH_TEST_UNSET_KEY_VAR".to_string(),
            timeout_seconds: Some(12),
            ..LlmConfig::default()
        };
        let config = CompletionConfig::from_llm_config(&llm);
        assert_eq!(config.model, "llama3-8b-8192");
        assert_eq!(config.timeout, Some(Duration::from_secs(12)));
        assert!(config.api_key.is_empty());
    }
}
