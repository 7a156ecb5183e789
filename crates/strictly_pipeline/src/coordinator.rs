//! The pipeline coordinator: Analysis, Planning, Execution under deadlines.
//!
//! Each stage gets its own budget and the whole run a hard ceiling. A
//! stage that fails or runs out of time is replaced by its entry in the
//! [`fallback`](crate::fallback) table; only an illegal fallback move or a
//! broken invariant aborts the turn, and then the input state is untouched.

use crate::agent_result::{AgentResult, duration_ms};
use crate::agents::{
    Executor, ModelAssistedScout, ModelAssistedStrategist, MoveExecutor, RuleBasedScout,
    RuleBasedStrategist, Scout, Strategist,
};
use crate::config::{AgentMode, ConfigError, PipelineConfig};
use crate::fallback::{
    FallbackRecord, Stage, StageFailure, analysis_fallback, execution_fallback, planning_fallback,
};
use crate::llm_client::{LanguageModel, LlmClient};
use crate::retry::RetryPolicy;
use crate::session::PipelineState;
use crate::types::{BoardAnalysis, MoveExecution, Strategy};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strictly_tictactoe::{GameState, MoveError, RulesEngine};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Fatal pipeline error. The game state is never modified when one occurs.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum PipelineError {
    /// The turn was requested for a state that does not allow it.
    #[display("Illegal move: {}", _0)]
    IllegalMove(MoveError),

    /// A fallback substitute was itself illegal.
    #[display("{} fallback produced an illegal move: {}", stage, error)]
    FallbackRejected {
        /// Stage whose fallback failed.
        stage: Stage,
        /// Why the move was illegal.
        error: MoveError,
    },

    /// Nothing left to play.
    #[display("No legal move available")]
    NoMoveAvailable,

    /// A game invariant does not hold.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),

    /// The run exceeded its hard ceiling.
    #[display("Pipeline exceeded its {}ms ceiling", _0)]
    DeadlineExceeded(u64),

    /// The session state machine refused a transition.
    #[display("Invalid pipeline transition {} -> {}", from, to)]
    InvalidTransition {
        /// Current state.
        from: PipelineState,
        /// Requested state.
        to: PipelineState,
    },
}

impl std::error::Error for PipelineError {}

impl From<MoveError> for PipelineError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::InvariantViolation(description) => PipelineError::InvariantViolation(description),
            other => PipelineError::IllegalMove(other),
        }
    }
}

impl PipelineError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::IllegalMove(_) => "illegal_move",
            PipelineError::FallbackRejected { .. } => "fallback_rejected",
            PipelineError::NoMoveAvailable => "no_move_available",
            PipelineError::InvariantViolation(_) => "invariant_violation",
            PipelineError::DeadlineExceeded(_) => "deadline_exceeded",
            PipelineError::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

/// Result of one automated turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiTurn {
    /// State after the move.
    pub updated_state: GameState,
    /// How the move was executed.
    #[serde(rename = "execution_details")]
    pub execution: MoveExecution,
    /// True when any stage was replaced.
    pub fallback_used: bool,
    /// Reasons for every replacement, joined.
    pub fallback_reason: Option<String>,
    /// Each replacement in stage order.
    pub fallbacks: Vec<FallbackRecord>,
    /// True when a model contributed to the decision.
    pub model_assisted: bool,
    /// Analysis the move was planned from.
    pub analysis: BoardAnalysis,
    /// Plan that was executed.
    pub strategy: Strategy,
    /// Pipeline states visited after AI_TURN, ending in PLAYER_TURN or COMPLETED.
    pub path: Vec<PipelineState>,
    /// Wall time of the run.
    pub elapsed_ms: u64,
}

struct StageOutput<T> {
    data: T,
    model_assisted: bool,
}

/// Waits for a stage up to `budget`. Late results are dropped with the future.
async fn run_stage<T, F>(budget: Duration, stage: F) -> Result<StageOutput<T>, StageFailure>
where
    F: Future<Output = AgentResult<T>>,
{
    let result = tokio::time::timeout(budget, stage)
        .await
        .map_err(|_| StageFailure::TimedOut(budget))?;
    let model_assisted = result.flag("model_assisted");
    let success = result.is_success();
    let error = result.error().map(str::to_string);
    match result.into_data() {
        Some(data) if success => Ok(StageOutput {
            data,
            model_assisted,
        }),
        _ => Err(StageFailure::Failed(
            error.unwrap_or_else(|| "stage returned no data".to_string()),
        )),
    }
}

/// The decision pipeline for one game.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    rules: RulesEngine,
    scout: Box<dyn Scout>,
    strategist: Box<dyn Strategist>,
    executor: Box<dyn MoveExecutor>,
}

impl Pipeline {
    /// Builds a pipeline from explicit stage implementations.
    #[instrument(skip(config, scout, strategist), fields(scout = scout.name(), strategist = strategist.name()))]
    pub fn new(config: PipelineConfig, scout: Box<dyn Scout>, strategist: Box<dyn Strategist>) -> Self {
        let rules = RulesEngine::new(*config.draw_detection());
        info!("Creating pipeline");
        Self {
            config,
            rules,
            scout,
            strategist,
            executor: Box::new(Executor::new(rules)),
        }
    }

    /// Replaces the rules-backed Execution stage.
    pub fn with_executor(mut self, executor: Box<dyn MoveExecutor>) -> Self {
        debug!(executor = executor.name(), "Replacing executor");
        self.executor = executor;
        self
    }

    /// Rule-based stages only.
    pub fn rule_based(config: PipelineConfig) -> Self {
        Self::new(config, Box::new(RuleBasedScout), Box::new(RuleBasedStrategist))
    }

    /// Model-assisted Analysis and Planning over `model`.
    pub fn model_assisted(config: PipelineConfig, model: Arc<dyn LanguageModel>) -> Self {
        let retry = RetryPolicy::from(*config.retry());
        let scout = ModelAssistedScout::new(
            model.clone(),
            config.llm().clone(),
            retry,
            config.timeouts().analysis(),
        );
        let strategist = ModelAssistedStrategist::new(
            model,
            config.llm().clone(),
            retry,
            config.timeouts().planning(),
        );
        Self::new(config, Box::new(scout), Box::new(strategist))
    }

    /// Builds the variant named by `agent_mode`.
    ///
    /// # Errors
    ///
    /// Model-assisted mode without a model is a [`ConfigError`].
    pub fn from_config(
        config: PipelineConfig,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Result<Self, ConfigError> {
        match (*config.agent_mode(), model) {
            (AgentMode::RuleBased, _) => Ok(Self::rule_based(config)),
            (AgentMode::ModelAssisted, Some(model)) => Ok(Self::model_assisted(config, model)),
            (AgentMode::ModelAssisted, None) => Err(ConfigError::new(
                "model_assisted mode requires a language model".to_string(),
            )),
        }
    }

    /// Builds the configured variant, creating a provider client from the
    /// environment when a model is needed.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the provider's API key is missing.
    #[instrument(skip(config), fields(mode = %config.agent_mode()))]
    pub fn connect(config: PipelineConfig) -> Result<Self, ConfigError> {
        let model: Option<Arc<dyn LanguageModel>> = match config.agent_mode() {
            AgentMode::RuleBased => None,
            AgentMode::ModelAssisted => {
                let llm_config = config.llm().create_llm_config()?;
                Some(Arc::new(LlmClient::new(llm_config)))
            }
        };
        Self::from_config(config, model)
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The rules engine every stage validates against.
    pub fn rules(&self) -> &RulesEngine {
        &self.rules
    }

    /// Runs one automated turn.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the state does not allow an
    /// automated move, when a fallback move is illegal, when an invariant
    /// breaks, or when the hard ceiling passes. `state` is never modified.
    #[instrument(skip(self, state), fields(move_count = state.move_count(), mode = %self.config.agent_mode()))]
    pub async fn take_ai_turn(&self, state: &GameState) -> Result<AiTurn, PipelineError> {
        self.rules.check_invariants(state)?;
        if state.is_terminal() {
            return Err(PipelineError::IllegalMove(MoveError::GameOver));
        }
        if !state.is_ai_turn() {
            return Err(PipelineError::IllegalMove(MoveError::WrongTurn {
                expected: state.current_turn(),
                actual: state.ai_symbol(),
            }));
        }

        let ceiling = self.config.timeouts().ceiling();
        match tokio::time::timeout(ceiling, self.run(state)).await {
            Ok(Ok(turn)) => {
                info!(
                    position = %turn.execution.position,
                    priority = %turn.execution.priority_used,
                    fallback_used = turn.fallback_used,
                    elapsed_ms = turn.elapsed_ms,
                    "AI turn complete"
                );
                Ok(turn)
            }
            Ok(Err(err)) => {
                error!(error = %err, kind = err.kind(), "AI turn aborted");
                Err(err)
            }
            Err(_) => {
                let err = PipelineError::DeadlineExceeded(duration_ms(ceiling));
                error!(error = %err, "AI turn aborted");
                Err(err)
            }
        }
    }

    fn substitute(
        &self,
        stage: Stage,
        failure: &StageFailure,
        fallbacks: &mut Vec<FallbackRecord>,
        path: &mut Vec<PipelineState>,
    ) {
        let record = FallbackRecord::new(stage, failure);
        warn!(
            %stage,
            reason = %record.reason,
            substituted = %record.substituted,
            "Stage replaced by fallback"
        );
        fallbacks.push(record);
        path.push(PipelineState::Fallback);
    }

    async fn run(&self, state: &GameState) -> Result<AiTurn, PipelineError> {
        let started = Instant::now();
        let timeouts = *self.config.timeouts();
        let mut fallbacks = Vec::new();
        let mut path = vec![PipelineState::AiScout];
        let mut model_assisted = false;

        let analysis = match run_stage(timeouts.analysis(), self.scout.analyze(state)).await {
            Ok(output) => {
                model_assisted |= output.model_assisted;
                output.data
            }
            Err(failure) => {
                self.substitute(Stage::Analysis, &failure, &mut fallbacks, &mut path);
                analysis_fallback(state)
            }
        };
        debug!(summary = %analysis.summary, "Analysis ready");

        path.push(PipelineState::AiStrategist);
        let strategy = match run_stage(timeouts.planning(), self.strategist.plan(state, &analysis)).await {
            Ok(output) => {
                model_assisted |= output.model_assisted;
                output.data
            }
            Err(failure) => {
                self.substitute(Stage::Planning, &failure, &mut fallbacks, &mut path);
                let strategy = planning_fallback(state, &analysis).ok_or(PipelineError::NoMoveAvailable)?;
                self.rules
                    .validate_move(state, strategy.primary.position, state.ai_symbol())
                    .map_err(|error| PipelineError::FallbackRejected {
                        stage: Stage::Planning,
                        error,
                    })?;
                strategy
            }
        };
        debug!(position = %strategy.primary.position, plan = %strategy.plan, "Strategy ready");

        path.push(PipelineState::AiExecutor);
        let mut execution = match run_stage(timeouts.execution(), self.executor.execute(state, &strategy)).await {
            Ok(output) => output.data,
            Err(failure) => {
                self.substitute(Stage::Execution, &failure, &mut fallbacks, &mut path);
                execution_fallback(&self.rules, state, &strategy).map_err(|error| {
                    PipelineError::FallbackRejected {
                        stage: Stage::Execution,
                        error,
                    }
                })?
            }
        };

        let updated_state = execution.resulting_state.take().ok_or_else(|| {
            PipelineError::InvariantViolation("execution reported success without a state".to_string())
        })?;
        self.rules.check_invariants(&updated_state)?;

        path.push(if updated_state.is_terminal() {
            PipelineState::Completed
        } else {
            PipelineState::PlayerTurn
        });

        let fallback_reason = (!fallbacks.is_empty()).then(|| {
            fallbacks
                .iter()
                .map(|f| f.reason.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        });

        Ok(AiTurn {
            updated_state,
            execution,
            fallback_used: !fallbacks.is_empty(),
            fallback_reason,
            fallbacks,
            model_assisted,
            analysis,
            strategy,
            path,
            elapsed_ms: duration_ms(started.elapsed()),
        })
    }
}
