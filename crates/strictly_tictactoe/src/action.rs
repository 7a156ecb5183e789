//! First-class move records and the illegal-move taxonomy.
//!
//! Moves are domain events, not side effects. A [`MoveRecord`] is what the
//! rules engine appends to the history once a move has been applied.

use crate::position::Position;
use crate::types::Player;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An applied move: who placed a mark where, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct MoveRecord {
    /// The position where the mark was placed.
    pub position: Position,
    /// The player who made the move.
    pub player: Player,
    /// When the move was applied.
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.player, self.position)
    }
}

/// Error that can occur when validating or applying a move.
///
/// Illegal moves are never retried; the caller receives the specific reason
/// and the game state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveError {
    /// A coordinate lies outside `[0, 2]`.
    #[display("Position ({}, {}) is out of bounds", row, col)]
    OutOfBounds {
        /// Requested row.
        row: u8,
        /// Requested column.
        col: u8,
    },

    /// The cell at the position is already occupied.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(Position),

    /// The game is already over.
    #[display("Game is already over")]
    GameOver,

    /// It's not this player's turn.
    #[display("It's not {}'s turn (expected {})", actual, expected)]
    WrongTurn {
        /// The recorded turn owner.
        expected: Player,
        /// The player who tried to move.
        actual: Player,
    },

    /// The mover symbol is not a valid player.
    #[display("Invalid player symbol: {:?}", _0)]
    InvalidPlayer(String),

    /// An invariant was violated (postcondition failure).
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),
}

impl std::error::Error for MoveError {}

impl MoveError {
    /// Stable machine-readable kind for reporting at the boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            MoveError::OutOfBounds { .. } => "out_of_bounds",
            MoveError::CellOccupied(_) => "cell_occupied",
            MoveError::GameOver => "game_over",
            MoveError::WrongTurn { .. } => "wrong_turn",
            MoveError::InvalidPlayer(_) => "invalid_player",
            MoveError::InvariantViolation(_) => "invariant_violation",
        }
    }
}
