use crate::domain::ports::{CompletionProvider, ProviderFailure};
use crate::utils::error::{Result, SimError};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Transport settings for one provider, passed in at construction. Retry,
/// throttling and concurrency belong to `PredictorOptions`.
#[derive(Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            temperature: 1.0,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Reads the API key from the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self> {
        let api_key = std::env::var(var_name)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SimError::MissingConfigError {
                field: format!("environment variable {}", var_name),
            })?;
        Ok(Self::new(api_key))
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Validate for ProviderSettings {
    fn validate(&self) -> Result<()> {
        validate_url("provider.base_url", &self.base_url)?;
        validate_non_empty_string("provider.api_key", &self.api_key)?;
        validate_range("provider.temperature", self.temperature, 0.0, 2.0)?;
        if self.request_timeout.is_zero() {
            return Err(SimError::InvalidConfigValueError {
                field: "provider.timeout".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client. One call, no retries.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            timeout: settings.request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_error(&self, err: reqwest::Error) -> ProviderFailure {
        if err.is_timeout() {
            ProviderFailure::Timeout(self.timeout)
        } else if err.is_connect() {
            ProviderFailure::Connect(err.to_string())
        } else if err.is_decode() {
            ProviderFailure::InvalidResponse(err.to_string())
        } else {
            ProviderFailure::Transport(err.to_string())
        }
    }
}

fn classify_status(status: StatusCode) -> ProviderFailure {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderFailure::Unauthorized(status.as_u16())
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ProviderFailure::Status(status.as_u16())
        }
        s if s.is_server_error() => ProviderFailure::Status(s.as_u16()),
        s => ProviderFailure::Rejected(s.as_u16()),
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
    ) -> std::result::Result<String, ProviderFailure> {
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        tracing::debug!("📡 POST {} (model {})", self.endpoint, model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Provider answered HTTP {}", status);
            return Err(classify_status(status));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| self.classify_error(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderFailure::InvalidResponse("no message content".to_string()))
    }
}
