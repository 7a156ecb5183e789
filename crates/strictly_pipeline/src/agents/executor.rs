//! Execution stage: re-validate the chosen move, then apply it.

use crate::agent_result::{AgentResult, duration_ms};
use crate::types::{MoveExecution, Strategy, ValidationError};
use async_trait::async_trait;
use serde_json::json;
use strictly_tictactoe::{GameState, RulesEngine};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// The Execution stage contract.
#[async_trait]
pub trait MoveExecutor: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs and fallback records.
    fn name(&self) -> &'static str;

    /// Plays the strategy's primary recommendation for the AI symbol.
    async fn execute(&self, state: &GameState, strategy: &Strategy) -> AgentResult<MoveExecution>;
}

/// Applies a strategy's primary move through the rules engine.
///
/// The position is checked against the current state immediately before it
/// is applied. An illegal position is reported, never swapped for another.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    rules: RulesEngine,
}

impl Executor {
    /// Creates an executor over the given rules engine.
    pub fn new(rules: RulesEngine) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl MoveExecutor for Executor {
    fn name(&self) -> &'static str {
        "rules_executor"
    }

    /// A state where the human is to move fails with a wrong-turn error.
    #[instrument(skip(self, state, strategy), fields(position = %strategy.primary.position))]
    async fn execute(&self, state: &GameState, strategy: &Strategy) -> AgentResult<MoveExecution> {
        let started = Instant::now();
        let primary = &strategy.primary;
        let mover = state.ai_symbol();

        let mut execution = MoveExecution {
            position: primary.position,
            success: false,
            validation_errors: Vec::new(),
            elapsed_ms: 0,
            rationale: primary.rationale.clone(),
            priority_used: primary.priority,
            resulting_state: None,
        };

        let applied = self
            .rules
            .validate_move(state, primary.position, mover)
            .and_then(|()| self.rules.apply_move(state, primary.position, mover));

        match applied {
            Ok(next) => {
                execution.success = true;
                execution.elapsed_ms = duration_ms(started.elapsed());
                execution.resulting_state = Some(next);
                debug!(%mover, "Move executed");
                AgentResult::ok(execution, started.elapsed()).with_metadata("mover", json!(mover.to_string()))
            }
            Err(err) => {
                warn!(error = %err, "Recommended move failed validation");
                execution.validation_errors.push(ValidationError::from(&err));
                execution.elapsed_ms = duration_ms(started.elapsed());
                AgentResult::failed(
                    format!("Validation failed: {}", err),
                    Some(execution),
                    started.elapsed(),
                )
                .with_metadata("error_kind", json!(err.kind()))
            }
        }
    }
}
