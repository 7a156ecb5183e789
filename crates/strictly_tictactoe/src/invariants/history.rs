//! History invariant: move history, move count and board agree.

use super::Invariant;
use crate::{GameState, Square};

/// Invariant: every filled cell has exactly one history entry, the move
/// count matches the history, and movers alternate starting with X.
pub struct HistoryConsistentInvariant;

impl Invariant<GameState> for HistoryConsistentInvariant {
    fn holds(state: &GameState) -> bool {
        let history = state.move_history();
        if history.len() != state.move_count() as usize {
            return false;
        }
        if history.len() != state.board().filled() {
            return false;
        }
        let alternates = history.iter().enumerate().all(|(i, record)| {
            let expected = if i % 2 == 0 {
                crate::Player::X
            } else {
                crate::Player::O
            };
            record.player == expected
        });
        alternates
            && history
                .iter()
                .all(|record| state.board().get(record.position) == Some(Square::Occupied(record.player)))
    }

    fn description() -> &'static str {
        "Move history is consistent with the board"
    }
}
