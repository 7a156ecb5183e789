//! Terminal-state invariant: winner and terminal flag agree with the board.

use super::Invariant;
use crate::rules::{check_winner, is_draw};
use crate::{GameState, Outcome};

/// Invariant: a winning line forces a terminal win; a full board with no
/// winner forces a terminal draw; a live game has no outcome.
pub struct TerminalConsistentInvariant;

impl Invariant<GameState> for TerminalConsistentInvariant {
    fn holds(state: &GameState) -> bool {
        let board = state.board();
        if let Some(player) = check_winner(board) {
            return state.is_terminal() && state.winner() == Some(Outcome::Winner(player));
        }
        if is_draw(board) {
            return state.is_terminal() && state.winner() == Some(Outcome::Draw);
        }
        match state.winner() {
            // An early (inevitable) draw is terminal before the board fills.
            Some(Outcome::Draw) => state.is_terminal(),
            Some(Outcome::Winner(_)) => false,
            None => !state.is_terminal(),
        }
    }

    fn description() -> &'static str {
        "Terminal flag and winner agree with the board"
    }
}
