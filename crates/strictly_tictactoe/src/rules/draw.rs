//! Draw detection logic for tic-tac-toe.

use super::win::check_winner;
use crate::types::{Board, Player, Square};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// How eagerly the rules engine declares a draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrawDetection {
    /// Only a full board with no winner is a draw.
    #[default]
    Complete,
    /// Additionally end the game once neither player can still complete a line.
    Inevitable,
}

/// Minimum number of moves before an inevitable draw is considered.
pub const INEVITABLE_DRAW_MIN_MOVES: usize = 7;

/// Checks if the board is full (all squares occupied).
#[instrument(skip(board))]
pub fn is_full(board: &Board) -> bool {
    board.is_full()
}

/// A full board with no winner.
#[instrument(skip(board))]
pub fn is_draw(board: &Board) -> bool {
    is_full(board) && check_winner(board).is_none()
}

/// Neither player can still complete a line.
///
/// Applies only once at least seven moves are on the board and at least one
/// cell is empty. Each player's symbol is tried in every empty cell at once;
/// if that yields no line for either player the game cannot be won.
#[instrument(skip(board))]
pub fn is_inevitable_draw(board: &Board) -> bool {
    if board.filled() < INEVITABLE_DRAW_MIN_MOVES || is_full(board) {
        return false;
    }
    if check_winner(board).is_some() {
        return false;
    }
    [Player::X, Player::O].into_iter().all(|player| {
        let mut filled = board.clone();
        for pos in board.empty_positions() {
            filled.set(pos, Square::Occupied(player));
        }
        check_winner(&filled) != Some(player)
    })
}
