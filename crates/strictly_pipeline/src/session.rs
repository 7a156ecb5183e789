//! Game session: one game, one pipeline, one writer.

use crate::coordinator::{AiTurn, Pipeline, PipelineError};
use serde::{Deserialize, Serialize};
use strictly_tictactoe::{GameState, Player, Position};
use tracing::{debug, error, info, instrument, warn};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Where a session is in the turn cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Created, not started.
    New,
    /// Waiting for the human.
    PlayerTurn,
    /// The automated opponent is about to move.
    AiTurn,
    /// Analysis running.
    AiScout,
    /// Planning running.
    AiStrategist,
    /// Execution running.
    AiExecutor,
    /// A stage was replaced by its fallback.
    Fallback,
    /// The last automated turn aborted.
    Error,
    /// The game is over.
    Completed,
}

impl PipelineState {
    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match self {
            New => matches!(next, PlayerTurn | AiTurn),
            PlayerTurn => matches!(next, AiTurn | Completed),
            AiTurn => matches!(next, AiScout | Error),
            AiScout => matches!(next, AiStrategist | Fallback | Error),
            AiStrategist => matches!(next, AiExecutor | Fallback | Error),
            AiExecutor => matches!(next, PlayerTurn | Completed | Fallback | Error),
            Fallback => matches!(
                next,
                AiStrategist | AiExecutor | PlayerTurn | Completed | Error
            ),
            Error => matches!(next, PlayerTurn | Completed | AiTurn),
            Completed => false,
        }
    }
}

/// A single game against the automated opponent.
///
/// The session is the only writer of its [`GameState`]: the human's moves go
/// through the rules engine, the opponent's through the pipeline, and the
/// stored state is replaced only by a successful result.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    state: GameState,
    phase: PipelineState,
    pipeline: Pipeline,
    last_turn: Option<AiTurn>,
}

impl GameSession {
    /// Creates a new session; the human plays `player_symbol`.
    #[instrument(skip(pipeline))]
    pub fn new(id: SessionId, player_symbol: Player, pipeline: Pipeline) -> Self {
        info!(session_id = %id, %player_symbol, "Creating new game session");
        let state = pipeline.rules().new_game(player_symbol);
        Self {
            id,
            state,
            phase: PipelineState::New,
            pipeline,
            last_turn: None,
        }
    }

    /// Session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Current pipeline state.
    pub fn phase(&self) -> PipelineState {
        self.phase
    }

    /// The most recent successful automated turn.
    pub fn last_turn(&self) -> Option<&AiTurn> {
        self.last_turn.as_ref()
    }

    /// The pipeline driving the opponent.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn advance(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.phase.can_transition_to(next) {
            warn!(from = %self.phase, to = %next, "Rejected pipeline transition");
            return Err(PipelineError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!(from = %self.phase, to = %next, "Pipeline transition");
        self.phase = next;
        Ok(())
    }

    fn phase_for_state(&self) -> PipelineState {
        if self.state.is_terminal() {
            PipelineState::Completed
        } else if self.state.is_ai_turn() {
            PipelineState::AiTurn
        } else {
            PipelineState::PlayerTurn
        }
    }

    /// Leaves NEW for whichever side moves first.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn start(&mut self) -> Result<PipelineState, PipelineError> {
        let next = self.phase_for_state();
        self.advance(next)?;
        info!(phase = %self.phase, "Session started");
        Ok(self.phase)
    }

    /// Applies the human's move.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IllegalMove`] with the specific reason; the
    /// state does not change.
    #[instrument(skip(self), fields(session_id = %self.id, %position))]
    pub fn submit_player_move(&mut self, position: Position) -> Result<&GameState, PipelineError> {
        if self.phase == PipelineState::New {
            self.start()?;
        }
        let mover = self.state.player_symbol();
        let next = self.pipeline.rules().apply_move(&self.state, position, mover)?;
        let next_phase = if next.is_terminal() {
            PipelineState::Completed
        } else {
            PipelineState::AiTurn
        };
        self.advance(next_phase)?;
        self.state = next;
        info!(phase = %self.phase, "Player move applied");
        Ok(&self.state)
    }

    /// Runs the pipeline for the opponent's move.
    ///
    /// # Errors
    ///
    /// On a fatal pipeline error the state is unchanged and the session is
    /// left in ERROR, from which the turn may be retried.
    #[instrument(skip(self), fields(session_id = %self.id, phase = %self.phase))]
    pub async fn take_ai_turn(&mut self) -> Result<&AiTurn, PipelineError> {
        if self.phase == PipelineState::New {
            self.start()?;
        }
        if self.phase == PipelineState::Error {
            self.advance(PipelineState::AiTurn)?;
        }
        if self.phase != PipelineState::AiTurn {
            return Err(PipelineError::InvalidTransition {
                from: self.phase,
                to: PipelineState::AiScout,
            });
        }

        let turn = match self.pipeline.take_ai_turn(&self.state).await {
            Ok(turn) => turn,
            Err(err) => {
                error!(error = %err, "Automated turn failed, state unchanged");
                self.phase = PipelineState::Error;
                return Err(err);
            }
        };

        for &step in &turn.path {
            self.advance(step)?;
        }
        self.state = turn.updated_state.clone();
        let turn = self.last_turn.insert(turn);
        Ok(&*turn)
    }

    /// Starts over with the same symbols.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn reset(&mut self) -> Result<PipelineState, PipelineError> {
        info!("Resetting session");
        self.state = self.pipeline.rules().reset(&self.state);
        self.phase = PipelineState::New;
        self.last_turn = None;
        self.start()
    }
}
