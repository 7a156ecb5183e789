//! Language-model capability and its OpenAI and Anthropic clients.
//!
//! Stages only ever see the [`LanguageModel`] trait. [`LlmClient`] is the
//! network-backed implementation; tests substitute scripted doubles.

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI (GPT models).
    OpenAI,
    /// Anthropic (Claude models).
    Anthropic,
}

/// One prompt sent to a model.
#[derive(Debug, Clone, PartialEq, Getters, derive_new::new)]
pub struct GenerationRequest {
    /// Role and output-format instructions.
    #[new(into)]
    system_prompt: String,
    /// The board and question for this call.
    #[new(into)]
    prompt: String,
    /// Model identifier.
    #[new(into)]
    model: String,
    /// Response token cap.
    max_tokens: u32,
    /// Sampling temperature.
    temperature: f32,
}

/// A model's answer with usage accounting.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_new::new)]
pub struct Generation {
    /// Raw completion text.
    #[new(into)]
    text: String,
    /// Prompt plus completion tokens, when the provider reports them.
    tokens_used: u32,
    /// Wall time of the call.
    latency_ms: u64,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Produces a completion for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError>;
}

/// Configuration for LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    provider: LlmProvider,
    api_key: String,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key), fields(provider = ?provider))]
    pub fn new(provider: LlmProvider, api_key: String) -> Self {
        debug!("Creating LLM config");
        Self { provider, api_key }
    }

    /// Gets the provider.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Gets the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// LLM client that abstracts over multiple providers.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = ?config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!("Creating LLM client");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Generates a completion using Anthropic Claude.
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate_anthropic(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let started = Instant::now();

        debug!("Building Anthropic API request");
        let request_body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system_prompt,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        });

        debug!("Sending request to Anthropic");
        let response = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.config.api_key.clone())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Anthropic API request failed");
                let kind = if e.is_timeout() {
                    LlmErrorKind::Timeout
                } else {
                    LlmErrorKind::Transport
                };
                LlmError::new(kind, format!("Anthropic API request failed: {}", e))
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read Anthropic response");
            LlmError::new(LlmErrorKind::Transport, format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            error!(status = %status, response = %response_text, "Anthropic API error");
            return Err(LlmError::new(
                LlmErrorKind::from_status(status.as_u16()),
                format!("Anthropic API error {}: {}", status, response_text),
            ));
        }

        debug!(response_length = response_text.len(), "Parsing Anthropic response");
        let response_json: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
            error!(error = ?e, response = %response_text, "Failed to parse Anthropic response");
            LlmError::new(LlmErrorKind::Malformed, format!("Failed to parse response: {}", e))
        })?;

        let content = response_json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                error!(response = %response_json, "No text content in Anthropic response");
                LlmError::new(
                    LlmErrorKind::Malformed,
                    "No text content in Anthropic response".to_string(),
                )
            })?
            .to_string();

        let usage = &response_json["usage"];
        let tokens = usage["input_tokens"].as_u64().unwrap_or(0) + usage["output_tokens"].as_u64().unwrap_or(0);

        info!(content_length = content.len(), tokens, "Generated completion");
        Ok(Generation::new(
            content,
            u32::try_from(tokens).unwrap_or(u32::MAX),
            elapsed_ms(started),
        ))
    }

    /// Generates a completion using OpenAI.
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate_openai(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let started = Instant::now();

        let client = OpenAIClient::with_config(
            OpenAIConfig::new().with_api_key(self.config.api_key.clone()),
        );

        debug!("Building chat completion request");
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system_prompt.as_str())
                    .build()
                    .map_err(|e| {
                        error!(error = ?e, "Failed to build system message");
                        LlmError::new(
                            LlmErrorKind::Malformed,
                            format!("Failed to build system message: {}", e),
                        )
                    })?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(request.prompt.as_str())
                    .build()
                    .map_err(|e| {
                        error!(error = ?e, "Failed to build user message");
                        LlmError::new(
                            LlmErrorKind::Malformed,
                            format!("Failed to build user message: {}", e),
                        )
                    })?,
            ),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(request.model.as_str())
            .messages(messages)
            .max_tokens(request.max_tokens)
            .temperature(request.temperature)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build request");
                LlmError::new(LlmErrorKind::Malformed, format!("Failed to build request: {}", e))
            })?;

        debug!("Sending request to OpenAI");
        let response = client.chat().create(chat_request).await.map_err(|e| {
            error!(error = ?e, "OpenAI API error");
            let message = format!("OpenAI API error: {}", e);
            LlmError::new(LlmErrorKind::classify(&message), message)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                error!("No content in OpenAI response");
                LlmError::new(LlmErrorKind::Malformed, "No content in OpenAI response".to_string())
            })?;

        let tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0);

        info!(content_length = content.len(), tokens, "Generated completion");
        Ok(Generation::new(content, tokens, elapsed_ms(started)))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    #[instrument(skip(self, request), fields(provider = ?self.config.provider, model = %request.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        debug!("Generating completion");
        match self.config.provider {
            LlmProvider::OpenAI => self.generate_openai(request).await,
            LlmProvider::Anthropic => self.generate_anthropic(request).await,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Why a model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LlmErrorKind {
    /// Credentials rejected.
    Auth,
    /// Provider asked us to slow down.
    RateLimit,
    /// The call did not finish in its budget.
    Timeout,
    /// Network or server failure.
    Transport,
    /// The response could not be understood.
    Malformed,
    /// The model answered, but not in the requested shape.
    InvalidOutput,
}

impl LlmErrorKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimit
                | LlmErrorKind::Timeout
                | LlmErrorKind::Transport
                | LlmErrorKind::InvalidOutput
        )
    }

    /// Maps an HTTP status to an error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => LlmErrorKind::Auth,
            408 => LlmErrorKind::Timeout,
            429 => LlmErrorKind::RateLimit,
            _ => LlmErrorKind::Transport,
        }
    }

    /// Best-effort classification of a provider error message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("rate_limit") || lower.contains("429") {
            LlmErrorKind::RateLimit
        } else if lower.contains("api key")
            || lower.contains("api_key")
            || lower.contains("unauthorized")
            || lower.contains("401")
        {
            LlmErrorKind::Auth
        } else if lower.contains("timed out") || lower.contains("timeout") {
            LlmErrorKind::Timeout
        } else if lower.contains("deserialize") || lower.contains("parse") {
            LlmErrorKind::Malformed
        } else {
            LlmErrorKind::Transport
        }
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display)]
#[display("LLM error ({}): {} at {}:{}", kind, message, file, line)]
pub struct LlmError {
    /// Failure category.
    pub kind: LlmErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: LlmErrorKind, message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, %kind, "LLM error created");
        Self {
            kind,
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LlmErrorKind::from_status(401), LlmErrorKind::Auth);
        assert_eq!(LlmErrorKind::from_status(403), LlmErrorKind::Auth);
        assert_eq!(LlmErrorKind::from_status(429), LlmErrorKind::RateLimit);
        assert_eq!(LlmErrorKind::from_status(500), LlmErrorKind::Transport);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(LlmErrorKind::RateLimit.is_retryable());
        assert!(LlmErrorKind::Transport.is_retryable());
        assert!(LlmErrorKind::Timeout.is_retryable());
        assert!(LlmErrorKind::InvalidOutput.is_retryable());
        assert!(!LlmErrorKind::Auth.is_retryable());
        assert!(!LlmErrorKind::Malformed.is_retryable());
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            LlmErrorKind::classify("OpenAI API error: Rate limit reached for gpt-4o-mini"),
            LlmErrorKind::RateLimit
        );
        assert_eq!(
            LlmErrorKind::classify("OpenAI API error: Incorrect API key provided"),
            LlmErrorKind::Auth
        );
        assert_eq!(
            LlmErrorKind::classify("failed to deserialize api response"),
            LlmErrorKind::Malformed
        );
        assert_eq!(
            LlmErrorKind::classify("connection reset by peer"),
            LlmErrorKind::Transport
        );
    }

    #[test]
    fn test_error_records_location() {
        let err = LlmError::new(LlmErrorKind::Auth, "bad key".to_string());
        assert!(err.file.ends_with("llm_client.rs"));
        assert!(err.to_string().contains("auth"));
    }
}
