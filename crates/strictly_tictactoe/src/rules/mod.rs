//! Game rules for tic-tac-toe.
//!
//! This module contains pure functions for evaluating a board according to
//! tic-tac-toe rules. Rules are separated from board storage so the rules
//! engine, the invariants and the priority engine can share them.

pub mod draw;
pub mod lines;
pub mod win;

pub use draw::{DrawDetection, is_draw, is_full, is_inevitable_draw};
pub use lines::Line;
pub use win::{check_winner, winning_players};
