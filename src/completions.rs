//! Completion provider: the single external AI capability handlers consume.
//!
//! Handlers ask for one thing, `complete(system, prompt, options) -> text`,
//! and treat the returned text as the new working copy. The engine never
//! interprets completion output.
//!
//! [`OpenAiClient`] talks to any OpenAI-compatible chat-completions endpoint.
//! Configuration comes from the environment (`OPENAI_API_KEY`,
//! `OPENAI_MODEL`, `OPENAI_BASE_URL`), loaded through `dotenvy` so a local
//! `.env` file works in development.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

pub type Result<T> = std::result::Result<T, CompletionError>;

/// Errors from the completion provider.
#[derive(Debug, Error, Diagnostic)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    #[diagnostic(
        code(copydesk::completions::transport),
        help("Check network connectivity and the configured base URL.")
    )]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    #[diagnostic(code(copydesk::completions::api))]
    Api { status: u16, body: String },

    #[error("completion response contained no choices")]
    #[diagnostic(code(copydesk::completions::empty))]
    EmptyResponse,

    #[error("missing configuration: {what}")]
    #[diagnostic(
        code(copydesk::completions::config),
        help("Set the variable in the environment or a .env file.")
    )]
    MissingConfig { what: &'static str },
}

/// Per-request tuning knobs. Unset fields use provider defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The one capability handlers consume per action.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run a completion and return the model's text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String>;
}

/// Environment-derived configuration for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Resolve from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CompletionError::MissingConfig {
                what: "OPENAI_API_KEY",
            })?;
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible chat-completions APIs.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(OpenAiConfig::from_env()?))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    #[instrument(skip_all)]
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)?;
        debug!(model, chars = text.len(), "completion returned");
        Ok(text)
    }
}
