//! Turn invariant: the turn owner follows from the symbol counts.

use super::Invariant;
use crate::{GameState, Player};

/// Invariant: a live game's turn owner is derivable from the counts.
///
/// Equal counts mean X to move; one extra X means O to move. Terminal
/// states are exempt because no one moves again.
pub struct TurnDerivableInvariant;

impl Invariant<GameState> for TurnDerivableInvariant {
    fn holds(state: &GameState) -> bool {
        if state.is_terminal() {
            return true;
        }
        let x = state.board().count(Player::X);
        let o = state.board().count(Player::O);
        let expected = if x == o { Player::X } else { Player::O };
        state.current_turn() == expected
    }

    fn description() -> &'static str {
        "Turn owner matches symbol counts (X, O, X, O, ...)"
    }
}
