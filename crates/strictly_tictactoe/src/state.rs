//! The aggregate game state owned by a single game instance.

use crate::action::MoveRecord;
use crate::types::{Board, Outcome, Player};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete game state.
///
/// Created by [`RulesEngine::new_game`](crate::RulesEngine::new_game) and
/// only ever advanced by [`RulesEngine::apply_move`](crate::RulesEngine::apply_move),
/// which returns a fresh value. Once `is_terminal` is set the state accepts
/// no further moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct GameState {
    /// The board.
    pub(crate) board: Board,
    #[getter(skip)]
    pub(crate) current_turn: Player,
    #[getter(skip)]
    pub(crate) move_count: u32,
    #[getter(skip)]
    pub(crate) player_symbol: Player,
    #[getter(skip)]
    pub(crate) ai_symbol: Player,
    #[getter(skip)]
    pub(crate) is_terminal: bool,
    #[getter(skip)]
    pub(crate) winner: Option<Outcome>,
    /// Chronological move history.
    pub(crate) move_history: Vec<MoveRecord>,
    /// When the game was created.
    pub(crate) created_at: DateTime<Utc>,
    /// When the game last changed.
    pub(crate) updated_at: DateTime<Utc>,
    /// Free-form annotations.
    #[serde(default)]
    pub(crate) metadata: BTreeMap<String, serde_json::Value>,
}

impl GameState {
    pub(crate) fn fresh(player_symbol: Player) -> Self {
        let now = Utc::now();
        Self {
            board: Board::new(),
            current_turn: Player::X,
            move_count: 0,
            player_symbol,
            ai_symbol: player_symbol.opponent(),
            is_terminal: false,
            winner: None,
            move_history: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns the player whose turn it is.
    pub fn current_turn(&self) -> Player {
        self.current_turn
    }

    /// Number of moves applied so far.
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// Symbol assigned to the human player.
    pub fn player_symbol(&self) -> Player {
        self.player_symbol
    }

    /// Symbol assigned to the automated opponent.
    pub fn ai_symbol(&self) -> Player {
        self.ai_symbol
    }

    /// True once the game has a winner or a confirmed draw.
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// The decided outcome, if any.
    pub fn winner(&self) -> Option<Outcome> {
        self.winner
    }

    /// True when it is the automated opponent's move in a live game.
    pub fn is_ai_turn(&self) -> bool {
        !self.is_terminal && self.current_turn == self.ai_symbol
    }

    /// Attaches a metadata entry, consuming and returning the state.
    ///
    /// Metadata never influences the rules.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::{Player, Position, RulesEngine};

    #[test]
    fn test_accessors_track_applied_moves() {
        let rules = RulesEngine::default();
        let fresh = rules.new_game(Player::O);
        assert!(fresh.move_history().is_empty());
        assert_eq!(fresh.created_at(), fresh.updated_at());

        let next = rules.apply_move(&fresh, Position::CENTER, Player::X).unwrap();
        assert_eq!(next.move_history().len(), 1);
        assert_eq!(next.created_at(), fresh.created_at());
        assert!(next.updated_at() >= next.created_at());
        assert!(!next.board().is_empty(Position::CENTER));
        assert!(next.metadata().is_empty());
    }
}
