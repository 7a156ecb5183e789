//! Board-shape invariants: symbol balance and a single winner.

use super::Invariant;
use crate::rules::winning_players;
use crate::{GameState, Player};

/// Invariant: X and O counts differ by at most one, with X never behind.
pub struct SymbolBalanceInvariant;

impl Invariant<GameState> for SymbolBalanceInvariant {
    fn holds(state: &GameState) -> bool {
        let x = state.board().count(Player::X);
        let o = state.board().count(Player::O);
        x == o || x == o + 1
    }

    fn description() -> &'static str {
        "Symbol counts differ by at most one (X moves first)"
    }
}

/// Invariant: at most one symbol owns a winning line.
pub struct SingleWinnerInvariant;

impl Invariant<GameState> for SingleWinnerInvariant {
    fn holds(state: &GameState) -> bool {
        winning_players(state.board()).len() <= 1
    }

    fn description() -> &'static str {
        "At most one player has a winning line"
    }
}
