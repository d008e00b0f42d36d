//! OpenAI-compatible chat completions client used for live analysis.
//!
//! Mistral and OpenAI both expose `POST {base}/chat/completions` with bearer
//! auth, so one client serves both providers.

use super::generator::TextGenerator;
use super::prompts::DimensionPrompt;
use crate::error::GenerateError;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
const ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Mistral,
    OpenAi,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Mistral => "mistral",
            Provider::OpenAi => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Mistral => "mistral-large-latest",
            Provider::OpenAi => "gpt-4o",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Mistral => "https://api.mistral.ai/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Environment variables checked, in order, for the API key.
    pub fn key_variables(&self) -> &'static [&'static str] {
        match self {
            Provider::Mistral => &["MISTRAL_API_KEY", "MISTRALAI_API_KEY"],
            Provider::OpenAi => &["OPENAI_API_KEY"],
        }
    }
}

#[derive(Clone)]
pub struct LiveSettings {
    pub provider: Provider,
    pub model: String,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub min_request_interval: Duration,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl fmt::Debug for LiveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("min_request_interval", &self.min_request_interval)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

pub struct ChatCompletionsGenerator {
    client: Client,
    settings: LiveSettings,
    api_key: String,
    last_request: Mutex<Option<Instant>>,
}

impl ChatCompletionsGenerator {
    pub fn new(settings: LiveSettings, api_key: String) -> Result<Self, GenerateError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings,
            api_key,
            last_request: Mutex::new(None),
        })
    }

    /// Build from settings when an API key is configured.
    pub fn from_settings(settings: &LiveSettings) -> Option<Result<Self, GenerateError>> {
        let key = settings.api_key.clone()?;
        Some(Self::new(settings.clone(), key))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.api_base_url.trim_end_matches('/'))
    }

    /// Hold requests apart by at least `min_request_interval`.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.settings.min_request_interval {
                tokio::time::sleep(self.settings.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn send_once(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GenerateError::Auth(status.as_u16()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerateError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Malformed(e.to_string()))?;
        if let Some(usage) = &body.usage {
            debug!(
                "{} usage: {} prompt tokens, {} completion tokens",
                self.settings.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerateError::Malformed("response contained no message".to_string()))
    }
}

fn backoff(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(RETRY_MAX_DELAY)
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    fn name(&self) -> &str {
        self.settings.provider.name()
    }

    async fn generate(&self, prompt: &DimensionPrompt) -> Result<String, GenerateError> {
        let mut attempt = 0;
        loop {
            self.throttle().await;
            let start = Instant::now();
            match self.send_once(&prompt.text).await {
                Ok(text) => {
                    info!(
                        "{} answered for {} in {}ms",
                        self.settings.model,
                        prompt.dimension,
                        start.elapsed().as_millis()
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = backoff(attempt);
                    warn!(
                        "{} request for {} failed ({e}), retrying in {}ms",
                        self.settings.provider.name(),
                        prompt.dimension,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
