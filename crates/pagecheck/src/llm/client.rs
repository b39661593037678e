//! OpenAI-compatible chat completion client.
//!
//! Works against api.openai.com and any server exposing
//! `/v1/chat/completions` (ollama, llama.cpp, vLLM). An API key, when
//! configured, is sent as a bearer token.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Endpoint, model and credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Server base URL, without the `/v1/...` path
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Bearer token
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Whole-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Defaults with the key taken from `OPENAI_API_KEY`, if set
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_api_key(std::env::var(API_KEY_ENV).ok())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set or clear the API key; blank keys count as unset
    #[must_use]
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        self
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Whether a key is configured
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author role
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    /// Index of this choice
    #[serde(default)]
    pub index: u32,
    /// Generated message
    pub message: ChatMessage,
    /// Why generation stopped
    pub finish_reason: Option<String>,
}

/// Chat completion response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Model that answered
    #[serde(default)]
    pub model: String,
    /// Generated choices
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Content of the first choice
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// Errors from the LLM client
#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with an error status
    #[error("API error {status}: {body}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
    /// Response carried no choices
    #[error("Completion returned no choices")]
    EmptyResponse,
}

/// OpenAI-compatible HTTP client
#[derive(Debug, Clone)]
pub struct LlmClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmClient {
    /// Client for a configuration
    #[must_use]
    pub fn new(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        Self::with_client(config, client)
    }

    /// Client reusing a preconfigured `reqwest::Client`
    #[must_use]
    pub fn with_client(config: &LlmConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f64>,
    ) -> Result<ChatResponse, LlmClientError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
        };
        let url = format!("{}/v1/chat/completions", self.base_url);
        let start = Instant::now();

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        let response: ChatResponse = resp.json().await?;
        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            choices = response.choices.len(),
            "chat completion"
        );
        Ok(response)
    }

    /// Send a completion and return the first choice's text
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmClientError> {
        let response = self.chat(messages, None).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(LlmClientError::EmptyResponse)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = LlmConfig::default();
            assert_eq!(config.base_url, "https://api.openai.com");
            assert_eq!(config.model, "gpt-4");
            assert!(!config.has_api_key());
        }

        #[test]
        fn test_blank_key_is_unset() {
            let config = LlmConfig::default().with_api_key(Some("  ".into()));
            assert!(!config.has_api_key());
            let config = LlmConfig::default().with_api_key(Some("sk-1\n".into()));
            assert_eq!(config.api_key.as_deref(), Some("sk-1"));
        }

        #[test]
        fn test_key_never_serialized() {
            let config = LlmConfig::default().with_api_key(Some("sk-secret".into()));
            let json = serde_json::to_string(&config).unwrap();
            assert!(!json.contains("sk-secret"));
        }

        #[test]
        fn test_client_strips_trailing_slash() {
            let client = LlmClient::new(&LlmConfig::default().with_base_url("http://localhost:8081/"));
            assert_eq!(client.base_url(), "http://localhost:8081");
            assert_eq!(client.model(), "gpt-4");
        }
    }

    mod wire_tests {
        use super::*;

        #[test]
        fn test_request_omits_temperature() {
            let req = ChatRequest {
                model: "m".into(),
                messages: vec![ChatMessage::user("Hi")],
                temperature: None,
            };
            let json = serde_json::to_string(&req).unwrap();
            assert!(json.contains("\"role\":\"user\""));
            assert!(!json.contains("temperature"));
        }

        #[test]
        fn test_lenient_response() {
            let json = r#"{"choices":[{"message":{"role":"assistant","content":"fix it"},"finish_reason":"stop"}]}"#;
            let resp: ChatResponse = serde_json::from_str(json).unwrap();
            assert_eq!(resp.first_content(), Some("fix it"));
        }
    }

    mod http_tests {
        use super::*;

        #[tokio::test]
        async fn test_bearer_and_first_choice() {
            let app = Router::new().route(
                "/v1/chat/completions",
                post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(serde_json::json!({
                        "id": "c1",
                        "model": body["model"],
                        "choices": [{"index": 0, "message": {"role": "assistant", "content": auth}, "finish_reason": "stop"}]
                    }))
                }),
            );
            let base = serve(app).await;
            let config = LlmConfig::default()
                .with_base_url(base)
                .with_api_key(Some("sk-test".into()));
            let text = LlmClient::new(&config)
                .complete(vec![ChatMessage::user("hello")])
                .await
                .unwrap();
            assert_eq!(text, "Bearer sk-test");
        }

        #[tokio::test]
        async fn test_error_status() {
            let app = Router::new().route(
                "/v1/chat/completions",
                post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
            );
            let base = serve(app).await;
            let err = LlmClient::new(&LlmConfig::default().with_base_url(base))
                .complete(vec![ChatMessage::user("hello")])
                .await
                .unwrap_err();
            assert!(matches!(err, LlmClientError::ApiError { status: 401, .. }));
        }

        #[tokio::test]
        async fn test_empty_choices() {
            let app = Router::new().route(
                "/v1/chat/completions",
                post(|| async { Json(serde_json::json!({"choices": []})) }),
            );
            let base = serve(app).await;
            let err = LlmClient::new(&LlmConfig::default().with_base_url(base))
                .complete(vec![ChatMessage::user("hello")])
                .await
                .unwrap_err();
            assert!(matches!(err, LlmClientError::EmptyResponse));
        }
    }
}
