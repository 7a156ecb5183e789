//! Strictly Pipeline - the automated tic-tac-toe opponent
//!
//! Each automated move runs three stages in order, each under its own time
//! budget, with a deterministic fallback for any stage that fails.
//!
//! # Architecture
//!
//! - **Agents**: Analysis ([`Scout`]), Planning ([`Strategist`]) and
//!   Execution ([`MoveExecutor`], backed by [`Executor`]), rule-based or
//!   model-assisted
//! - **Coordinator**: [`Pipeline::take_ai_turn`] with per-stage deadlines and
//!   the fallback cascade
//! - **Session**: [`GameSession`], the single writer of a game's state
//! - **LLM**: the [`LanguageModel`] capability and its OpenAI/Anthropic client
//!
//! # Example
//!
//! ```no_run
//! use strictly_pipeline::{GameSession, Pipeline, PipelineConfig};
//! use strictly_tictactoe::Player;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = Pipeline::rule_based(PipelineConfig::default());
//! let mut session = GameSession::new("demo".to_string(), Player::O, pipeline);
//! session.start()?;
//! let turn = session.take_ai_turn().await?;
//! println!("AI played {}", turn.execution.position);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod agent_result;
mod agents;
mod config;
mod coordinator;
mod fallback;
mod llm_client;
mod retry;
mod session;
mod types;

// Crate-level exports - Stage envelope and payloads
pub use agent_result::AgentResult;
pub use types::{
    BoardAnalysis, GamePhase, MoveExecution, MoveRecommendation, Opportunity, RiskLevel, Severity,
    StrategicKind, StrategicMove, Strategy, Threat, ValidationError,
};

// Crate-level exports - Stages
pub use agents::{
    Executor, ModelAssistedScout, ModelAssistedStrategist, MoveExecutor, RuleBasedScout,
    RuleBasedStrategist, Scout, Strategist, assess_risk, extract_json, rank_candidates, rule_based_analysis,
    rule_based_strategy,
};

// Crate-level exports - Configuration
pub use config::{AgentMode, ConfigError, LlmSettings, PipelineConfig, RetrySettings, StageTimeouts};

// Crate-level exports - Coordinator and fallbacks
pub use coordinator::{AiTurn, Pipeline, PipelineError};
pub use fallback::{
    FallbackRecord, FallbackStrategy, Stage, StageFailure, analysis_fallback, execution_fallback,
    planning_fallback, planning_fallback_position,
};

// Crate-level exports - LLM client
pub use llm_client::{
    Generation, GenerationRequest, LanguageModel, LlmClient, LlmConfig, LlmError, LlmErrorKind,
    LlmProvider,
};
pub use retry::RetryPolicy;

// Crate-level exports - Session management
pub use session::{GameSession, PipelineState, SessionId};
