//! First-class invariants for tic-tac-toe game states.
//!
//! Invariants are logical properties that must hold for every state the
//! rules engine hands out. They are checked after every mutation and can be
//! tested independently.

mod board;
mod history;
mod terminal;
mod turn;

pub use board::{SingleWinnerInvariant, SymbolBalanceInvariant};
pub use history::HistoryConsistentInvariant;
pub use terminal::TerminalConsistentInvariant;
pub use turn::TurnDerivableInvariant;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{}", description)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for tuples of [`Invariant`]s so sets compose by type.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set.
    ///
    /// Returns Ok(()) if all invariants hold, or Err with every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>),+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !$inv::holds(state) {
                        violations.push(InvariantViolation::new($inv::description()));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);
impl_invariant_set!(I1, I2, I3, I4, I5);

/// All game-state invariants as a composable set.
pub type GameInvariants = (
    SymbolBalanceInvariant,
    TurnDerivableInvariant,
    SingleWinnerInvariant,
    TerminalConsistentInvariant,
    HistoryConsistentInvariant,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Player, Position, RulesEngine};

    #[test]
    fn test_invariant_set_holds_for_new_game() {
        let state = RulesEngine::default().new_game(Player::X);
        assert!(GameInvariants::check_all(&state).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_after_moves() {
        let state = RulesEngine::default()
            .replay(
                Player::X,
                &[Position::new(0, 0), Position::CENTER, Position::new(0, 2)],
            )
            .unwrap();
        assert!(GameInvariants::check_all(&state).is_ok());
    }

    #[test]
    fn test_invariant_set_detects_violations() {
        let mut state = RulesEngine::default()
            .replay(Player::X, &[Position::CENTER])
            .unwrap();
        // Corrupt the board behind the engine's back
        state
            .board
            .set(Position::new(0, 0), crate::Square::Occupied(Player::X));

        let violations = GameInvariants::check_all(&state).unwrap_err();
        assert!(violations.len() >= 2);
    }

    #[test]
    fn test_two_invariants_as_set() {
        let state = RulesEngine::default().new_game(Player::O);
        type TwoInvariants = (SymbolBalanceInvariant, TurnDerivableInvariant);
        assert!(TwoInvariants::check_all(&state).is_ok());
    }
}
