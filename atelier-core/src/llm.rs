//! Language model clients for Atelier
//!
//! Provides an `LlmBackend` trait with implementations for:
//! - **Ollama**: local models via `POST /api/generate` (default `gemma:2b`)
//! - **OpenAI-compatible**: any server exposing `POST /chat/completions`
//!
//! Both clients share the same retry policy: exponential backoff with jitter on
//! transport errors, HTTP 429 and HTTP 5xx. Other API errors fail immediately.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::LlmConfig;

// ============================================================================
// LlmBackend trait
// ============================================================================

/// Abstraction over text-completion providers.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Complete a free-text prompt.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Complete a prompt whose answer should be a single JSON object. Backends
    /// with a structured-output switch override this; the reply is still
    /// unvalidated text.
    async fn complete_json(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned an empty completion")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Unknown language model backend: {0}")]
    UnknownBackend(String),

    #[error("All {attempts} attempts failed: {last_error}")]
    RetryExhausted { attempts: usize, last_error: String },
}

impl LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Config types
// ============================================================================

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl LlmClientConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout_seconds: 60,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Configuration union for the backend factory.
pub enum LlmBackendConfig {
    Ollama(LlmClientConfig),
    OpenAi(LlmClientConfig),
}

impl LlmBackendConfig {
    /// Select a backend from `[llm] backend`. The OpenAI key comes from `OPENAI_API_KEY`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = LlmClientConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: None,
            timeout_seconds: config.timeout_seconds,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        };

        match config.backend.as_str() {
            "ollama" => Ok(LlmBackendConfig::Ollama(client)),
            "openai" => Ok(LlmBackendConfig::OpenAi(LlmClientConfig {
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                ..client
            })),
            other => Err(LlmError::UnknownBackend(other.to_string())),
        }
    }
}

/// Create the appropriate backend from configuration.
pub fn create_backend(config: LlmBackendConfig) -> Result<Box<dyn LlmBackend>, LlmError> {
    match config {
        LlmBackendConfig::Ollama(c) => Ok(Box::new(OllamaClient::new(c)?)),
        LlmBackendConfig::OpenAi(c) => Ok(Box::new(OpenAiCompatibleClient::new(c)?)),
    }
}

fn build_http_client(config: &LlmClientConfig) -> Result<Client, LlmError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

async fn with_retries<F, Fut>(config: &LlmClientConfig, backend: &str, action: F) -> Result<String, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, LlmError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(config.retry_delay_ms)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(config.max_retries);

    match RetryIf::start(retry_strategy, action, LlmError::is_retryable).await {
        Ok(text) => Ok(text),
        Err(e) if e.is_retryable() => {
            let attempts = config.max_retries + 1;
            tracing::error!(
                backend = backend,
                attempts = attempts,
                error = %e,
                "All completion attempts failed"
            );
            Err(LlmError::RetryExhausted {
                attempts,
                last_error: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Ollama
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

/// Ollama client: calls `POST {base_url}/api/generate` without streaming.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    config: LlmClientConfig,
}

impl OllamaClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub async fn generate(&self, prompt: &str, json: bool) -> Result<String, LlmError> {
        with_retries(&self.config, self.name(), || self.generate_once(prompt, json)).await
    }

    async fn generate_once(&self, prompt: &str, json: bool) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: json.then_some("json"),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorResponse>(&error_body)
                .map(|e| e.error)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Ollama API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: OllamaResponse = response.json().await?;
        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmBackend for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(prompt, false).await
    }

    async fn complete_json(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate(prompt, true).await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionContent {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// Client for servers speaking the OpenAI chat-completions dialect
/// (OpenAI, LM Studio, vLLM, llama.cpp server).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    config: LlmClientConfig,
}

impl OpenAiCompatibleClient {
    /// Hosted endpoints need a key; a local server on http:// does not.
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let has_key = config.api_key.as_deref().is_some_and(|k| !k.is_empty());
        if !has_key && config.base_url.starts_with("https://") {
            return Err(LlmError::MissingApiKey);
        }
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub async fn chat(&self, prompt: &str, json: bool) -> Result<String, LlmError> {
        with_retries(&self.config, self.name(), || self.chat_once(prompt, json)).await
    }

    async fn chat_once(&self, prompt: &str, json: bool) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatCompletionMessage {
                role: "user",
                content: prompt,
            }],
            response_format: json.then_some(ResponseFormat { kind: "json_object" }),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Chat completion API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatCompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(prompt, false).await
    }

    async fn complete_json(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(prompt, true).await
    }

    fn name(&self) -> &str {
        "openai"
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

    fn test_config(base_url: String) -> LlmClientConfig {
        LlmClientConfig {
            base_url,
            model: "gemma:2b".to_string(),
            api_key: None,
            timeout_seconds: 5,
            max_retries: 2,
            retry_delay_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_ollama_generate_sends_prompt_and_returns_text() {
        let mock_server = MockServer::start().await;
        let client = OllamaClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(serde_json::json!({
                "model": "gemma:2b",
                "prompt": "hello",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gemma:2b",
                "response": "  Hi there!  ",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        let text = client.complete("hello").await.unwrap();
        assert_eq!(text, "Hi there!");
    }

    #[tokio::test]
    async fn test_ollama_json_mode_sets_format() {
        let mock_server = MockServer::start().await;
        let client = OllamaClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(serde_json::json!({
                "model": "gemma:2b",
                "prompt": "extract",
                "stream": false,
                "format": "json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "{\"intent\":\"none\"}",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        let text = client.complete_json("extract").await.unwrap();
        assert_eq!(text, "{\"intent\":\"none\"}");
    }

    #[tokio::test]
    async fn test_ollama_retries_on_503_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = OllamaClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "model is loading"
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "ready",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        let text = client.complete("ping").await.unwrap();
        assert_eq!(text, "ready");
    }

    #[tokio::test]
    async fn test_ollama_retry_exhausted_on_persistent_500() {
        let mock_server = MockServer::start().await;
        let client = OllamaClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "boom"
            })))
            .expect(3)
            .mount(&mock_server)
            .await;

        match client.complete("ping").await {
            Err(LlmError::RetryExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("boom"));
            }
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ollama_does_not_retry_on_404() {
        let mock_server = MockServer::start().await;
        let client = OllamaClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "model 'gemma:2b' not found"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete("ping").await {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 404);
                assert!(message.contains("not found"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ollama_empty_completion_is_an_error() {
        let mock_server = MockServer::start().await;
        let client = OllamaClient::new(test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "   ",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.complete("ping").await,
            Err(LlmError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_openai_chat_sends_bearer_and_reads_first_choice() {
        let mock_server = MockServer::start().await;
        let config = LlmClientConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..test_config(mock_server.uri())
        };
        let client = OpenAiCompatibleClient::new(config).unwrap();

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{ "role": "user", "content": "hello" }],
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"ok\":true}" } }]
            })))
            .mount(&mock_server)
            .await;

        let text = client.complete_json("hello").await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
        assert_eq!(client.name(), "openai");
    }

    #[tokio::test]
    async fn test_openai_requires_key_for_https() {
        let config = test_config("https://api.openai.com/v1".to_string());
        assert!(matches!(
            OpenAiCompatibleClient::new(config),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn test_backend_config_rejects_unknown_backend() {
        let config = LlmConfig {
            backend: "carrier-pigeon".to_string(),
            base_url: "http://localhost".to_string(),
            model: "m".to_string(),
            timeout_seconds: 1,
            max_retries: 0,
            retry_delay_ms: 1,
        };
        assert!(matches!(
            LlmBackendConfig::from_config(&config),
            Err(LlmError::UnknownBackend(name)) if name == "carrier-pigeon"
        ));
    }

    #[test]
    fn test_backend_config_trims_trailing_slash() {
        let config = LlmConfig {
            backend: "ollama".to_string(),
            base_url: "http://localhost:11434/".to_string(),
            model: "gemma:2b".to_string(),
            timeout_seconds: 1,
            max_retries: 0,
            retry_delay_ms: 1,
        };
        match LlmBackendConfig::from_config(&config).unwrap() {
            LlmBackendConfig::Ollama(c) => assert_eq!(c.base_url, "http://localhost:11434"),
            LlmBackendConfig::OpenAi(_) => panic!("Expected Ollama config"),
        }
    }
}
