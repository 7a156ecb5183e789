//! The rules engine: legality checks and atomic state transitions.

use crate::action::{MoveError, MoveRecord};
use crate::invariants::{GameInvariants, InvariantSet};
use crate::position::Position;
use crate::rules::{self, DrawDetection};
use crate::state::GameState;
use crate::types::{Board, Outcome, Player, Square};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Tic-tac-toe rules engine.
///
/// Stateless apart from its draw-detection mode; every operation takes the
/// state it reads and returns the state it produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesEngine {
    draw_detection: DrawDetection,
}

impl RulesEngine {
    /// Creates a rules engine with the given draw-detection mode.
    #[instrument]
    pub fn new(draw_detection: DrawDetection) -> Self {
        Self { draw_detection }
    }

    /// The configured draw-detection mode.
    pub fn draw_detection(&self) -> DrawDetection {
        self.draw_detection
    }

    /// Starts a new game. X always moves first; the automated opponent gets
    /// whichever symbol the human did not take.
    #[instrument(skip(self))]
    pub fn new_game(&self, player_symbol: Player) -> GameState {
        info!(%player_symbol, "Starting new game");
        GameState::fresh(player_symbol)
    }

    /// Starts over with the same symbol assignment and metadata.
    #[instrument(skip(self, state))]
    pub fn reset(&self, state: &GameState) -> GameState {
        let mut fresh = GameState::fresh(state.player_symbol());
        fresh.metadata = state.metadata().clone();
        fresh
    }

    /// Checks every legality condition without touching the state.
    ///
    /// # Errors
    ///
    /// Returns the first failing condition: game over, out of bounds, cell
    /// occupied, or wrong turn.
    #[instrument(skip(self, state), fields(position = %position, mover = %mover))]
    pub fn validate_move(
        &self,
        state: &GameState,
        position: Position,
        mover: Player,
    ) -> Result<(), MoveError> {
        if state.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if !position.is_in_bounds() {
            return Err(MoveError::OutOfBounds {
                row: position.row(),
                col: position.col(),
            });
        }
        if !state.board().is_empty(position) {
            return Err(MoveError::CellOccupied(position));
        }
        if mover != state.current_turn() {
            return Err(MoveError::WrongTurn {
                expected: state.current_turn(),
                actual: mover,
            });
        }
        Ok(())
    }

    /// Applies a move, returning the successor state.
    ///
    /// The input state is never modified. The successor has the mark placed,
    /// the turn toggled, the count and history advanced, and the
    /// terminal/winner fields recomputed, all in one step.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveError`] for any illegal move, or
    /// [`MoveError::InvariantViolation`] if the input or the successor breaks
    /// a game invariant.
    #[instrument(skip(self, state), fields(position = %position, mover = %mover, move_count = state.move_count()))]
    pub fn apply_move(
        &self,
        state: &GameState,
        position: Position,
        mover: Player,
    ) -> Result<GameState, MoveError> {
        self.check_invariants(state)?;
        self.validate_move(state, position, mover)?;

        let now = Utc::now();
        let mut next = state.clone();
        next.board.set(position, Square::Occupied(mover));
        next.move_history.push(MoveRecord::new(position, mover, now));
        next.move_count += 1;
        next.current_turn = mover.opponent();
        next.updated_at = now;

        if let Some(winner) = rules::check_winner(&next.board) {
            next.is_terminal = true;
            next.winner = Some(Outcome::Winner(winner));
        } else if rules::is_draw(&next.board) {
            next.is_terminal = true;
            next.winner = Some(Outcome::Draw);
        } else if self.draw_detection == DrawDetection::Inevitable
            && rules::is_inevitable_draw(&next.board)
        {
            debug!("No line can still be completed, ending early");
            next.is_terminal = true;
            next.winner = Some(Outcome::Draw);
        }

        self.check_invariants(&next)?;

        debug!(
            terminal = next.is_terminal,
            winner = ?next.winner,
            "Move applied"
        );
        Ok(next)
    }

    /// Empty cells of a live game; empty once the game is terminal.
    #[instrument(skip(self, state))]
    pub fn legal_moves(&self, state: &GameState) -> BTreeSet<Position> {
        if state.is_terminal() {
            return BTreeSet::new();
        }
        state.board().empty_positions().into_iter().collect()
    }

    /// The player holding a complete line, if any.
    pub fn winner(&self, board: &Board) -> Option<Player> {
        rules::check_winner(board)
    }

    /// Whether the board is a draw under this engine's detection mode.
    pub fn is_draw(&self, board: &Board) -> bool {
        match self.draw_detection {
            DrawDetection::Complete => rules::is_draw(board),
            DrawDetection::Inevitable => rules::is_draw(board) || rules::is_inevitable_draw(board),
        }
    }

    /// Verifies every game invariant.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::InvariantViolation`] listing each broken invariant.
    pub fn check_invariants(&self, state: &GameState) -> Result<(), MoveError> {
        GameInvariants::check_all(state).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%descriptions, "Game state invariant violated");
            MoveError::InvariantViolation(descriptions)
        })
    }

    /// Replays positions from a new game, movers alternating from X.
    ///
    /// # Errors
    ///
    /// Returns the first illegal move encountered.
    #[instrument(skip(self))]
    pub fn replay(&self, player_symbol: Player, moves: &[Position]) -> Result<GameState, MoveError> {
        moves
            .iter()
            .try_fold(self.new_game(player_symbol), |state, position| {
                self.apply_move(&state, *position, state.current_turn())
            })
    }
}
