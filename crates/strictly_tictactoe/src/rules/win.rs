//! Win detection logic for tic-tac-toe.

use super::lines::Line;
use crate::types::{Board, Player, Square};
use tracing::instrument;

/// Checks if there is a winner on the board.
///
/// Returns `Some(player)` for the first line holding three equal marks,
/// `None` otherwise.
#[instrument(skip(board))]
pub fn check_winner(board: &Board) -> Option<Player> {
    Line::ALL.iter().find_map(|line| line_owner(board, *line))
}

/// Every distinct player holding a complete line.
///
/// A reachable board yields at most one entry; more than one means the
/// board is corrupt.
pub fn winning_players(board: &Board) -> Vec<Player> {
    let mut players: Vec<Player> = Line::ALL
        .iter()
        .filter_map(|line| line_owner(board, *line))
        .collect();
    players.sort();
    players.dedup();
    players
}

fn line_owner(board: &Board, line: Line) -> Option<Player> {
    let [a, b, c] = line.cells();
    let sq = board.get(a)?;
    if sq != Square::Empty && Some(sq) == board.get(b) && Some(sq) == board.get(c) {
        sq.player()
    } else {
        None
    }
}
