//! Strictly Tic-Tac-Toe - pure game logic.
//!
//! This crate holds everything about the game that does not need I/O:
//!
//! - **Types**: [`Position`], [`Board`], [`GameState`], move records
//! - **Rules**: [`RulesEngine`] with legality checks, win/draw detection and
//!   atomic state transitions guarded by [`invariants`]
//! - **Priority engine**: [`PriorityEngine`], a deterministic move ranking
//!   over eight fixed [`MovePriority`] levels
//!
//! # Example
//!
//! ```
//! use strictly_tictactoe::{Player, Position, PriorityEngine, RulesEngine};
//!
//! let rules = RulesEngine::default();
//! let state = rules.new_game(Player::O);
//! let choice = PriorityEngine::new()
//!     .select(state.board(), state.current_turn())
//!     .expect("empty board has moves");
//! assert_eq!(choice.position, Position::CENTER);
//!
//! let next = rules.apply_move(&state, choice.position, Player::X).unwrap();
//! assert_eq!(next.current_turn(), Player::O);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod engine;
pub mod invariants;
mod position;
mod priority;
pub mod rules;
mod state;
mod types;

pub use action::{MoveError, MoveRecord};
pub use engine::RulesEngine;
pub use position::{Position, PositionKind};
pub use priority::{
    MovePriority, PriorityEngine, ScoredMove, fork_cells, threats_created, winning_cells,
};
pub use rules::{DrawDetection, Line};
pub use state::GameState;
pub use types::{Board, Outcome, Player, Square};
