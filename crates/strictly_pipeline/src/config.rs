//! Pipeline configuration: agent mode, stage timeouts, retries, model selection.

use crate::llm_client::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use strictly_tictactoe::DrawDetection;
use tracing::{debug, info, instrument};

/// How the analysis and planning stages reach their decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AgentMode {
    /// Priority engine only; no model calls.
    #[default]
    RuleBased,
    /// Priority engine plus a language model for rationale and ordering.
    ModelAssisted,
}

/// Per-stage time budgets, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct StageTimeouts {
    /// Analysis stage budget.
    #[serde(default = "default_analysis_ms")]
    analysis_ms: u64,
    /// Planning stage budget.
    #[serde(default = "default_planning_ms")]
    planning_ms: u64,
    /// Execution stage budget.
    #[serde(default = "default_execution_ms")]
    execution_ms: u64,
    /// Slack added on top of the stage budgets for the whole pipeline.
    #[serde(default = "default_buffer_ms")]
    buffer_ms: u64,
}

fn default_analysis_ms() -> u64 {
    5_000
}

fn default_planning_ms() -> u64 {
    5_000
}

fn default_execution_ms() -> u64 {
    3_000
}

fn default_buffer_ms() -> u64 {
    2_000
}

impl StageTimeouts {
    /// Analysis budget.
    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_ms)
    }

    /// Planning budget.
    pub fn planning(&self) -> Duration {
        Duration::from_millis(self.planning_ms)
    }

    /// Execution budget.
    pub fn execution(&self) -> Duration {
        Duration::from_millis(self.execution_ms)
    }

    /// Hard ceiling for one pipeline run: every stage budget plus the buffer.
    ///
    /// Saturates rather than overflowing for oversized budgets.
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(
            self.analysis_ms
                .saturating_add(self.planning_ms)
                .saturating_add(self.execution_ms)
                .saturating_add(self.buffer_ms),
        )
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            analysis_ms: default_analysis_ms(),
            planning_ms: default_planning_ms(),
            execution_ms: default_execution_ms(),
            buffer_ms: default_buffer_ms(),
        }
    }
}

/// Bounded retry settings for transient model failures inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct RetrySettings {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_base_backoff_ms")]
    base_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    100
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

/// Language-model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct LlmSettings {
    /// LLM provider (openai or anthropic).
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// LLM model name (e.g., "gpt-4o-mini", "claude-3-5-haiku-20241022").
    #[serde(default = "default_model")]
    #[setters(into)]
    model: String,

    /// Maximum tokens for LLM responses.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    temperature: f32,
}

fn default_provider() -> LlmProvider {
    LlmProvider::OpenAI
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmSettings {
    /// Creates the provider client configuration.
    /// Requires OPENAI_API_KEY or ANTHROPIC_API_KEY environment variable.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");

        let api_key = match self.provider {
            LlmProvider::OpenAI => std::env::var("OPENAI_API_KEY").map_err(|_| {
                ConfigError::new("OPENAI_API_KEY environment variable not set".to_string())
            })?,
            LlmProvider::Anthropic => std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                ConfigError::new("ANTHROPIC_API_KEY environment variable not set".to_string())
            })?,
        };

        Ok(LlmConfig::new(self.provider, api_key))
    }
}

/// Everything the coordinator needs, passed in at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct PipelineConfig {
    /// Rule-based or model-assisted stages.
    #[serde(default)]
    agent_mode: AgentMode,

    /// Stage time budgets.
    #[serde(default)]
    timeouts: StageTimeouts,

    /// Retry policy for model calls.
    #[serde(default)]
    retry: RetrySettings,

    /// Draw detection mode for the rules engine.
    #[serde(default)]
    draw_detection: DrawDetection,

    /// Model selection (used only in model-assisted mode).
    #[serde(default)]
    llm: LlmSettings,
}

impl PipelineConfig {
    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(mode = %config.agent_mode, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_budget_table() {
        let config = PipelineConfig::default();
        assert_eq!(config.timeouts().analysis(), Duration::from_secs(5));
        assert_eq!(config.timeouts().planning(), Duration::from_secs(5));
        assert_eq!(config.timeouts().execution(), Duration::from_secs(3));
        assert_eq!(config.timeouts().ceiling(), Duration::from_secs(15));
        assert_eq!(*config.retry().max_attempts(), 3);
        assert_eq!(*config.agent_mode(), AgentMode::RuleBased);
        assert_eq!(*config.draw_detection(), DrawDetection::Complete);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
agent_mode = "model_assisted"
draw_detection = "inevitable"

[timeouts]
analysis_ms = 250

[llm]
provider = "anthropic"
model = "claude-3-5-haiku-20241022"
"#,
        )
        .unwrap();
        assert_eq!(*config.agent_mode(), AgentMode::ModelAssisted);
        assert_eq!(*config.draw_detection(), DrawDetection::Inevitable);
        assert_eq!(*config.timeouts().analysis_ms(), 250);
        assert_eq!(*config.timeouts().planning_ms(), 5_000);
        assert_eq!(*config.llm().provider(), LlmProvider::Anthropic);
        assert_eq!(*config.llm().max_tokens(), 400);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = PipelineConfig::from_toml("agent_mode = 7").unwrap_err();
        assert!(err.message.contains("Failed to parse config"));
    }

    #[test]
    fn test_setters_chain() {
        let config = PipelineConfig::default()
            .with_agent_mode(AgentMode::ModelAssisted)
            .with_timeouts(StageTimeouts::default().with_analysis_ms(10));
        assert_eq!(*config.timeouts().analysis_ms(), 10);
        assert_eq!(*config.agent_mode(), AgentMode::ModelAssisted);
    }
}
