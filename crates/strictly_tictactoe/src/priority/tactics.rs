//! Tactical board scans shared by the priority engine and the analysis stage.

use crate::position::Position;
use crate::rules::Line;
use crate::types::{Board, Player};
use std::collections::BTreeSet;

/// Cells where `player` completes a line this move, paired with that line.
///
/// Ordered by position, then line. A cell completing two lines appears twice.
pub fn winning_cells(board: &Board, player: Player) -> Vec<(Position, Line)> {
    let mut cells: Vec<(Position, Line)> = Line::ALL
        .iter()
        .filter_map(|line| line.completing_cell(board, player).map(|pos| (pos, *line)))
        .collect();
    cells.sort();
    cells
}

/// Lines through `pos` that would hold two of `player`'s marks and one
/// empty cell after `player` moves there.
pub fn threats_created(board: &Board, pos: Position, player: Player) -> Vec<Line> {
    if !board.is_empty(pos) {
        return Vec::new();
    }
    let after = board.with_mark(pos, player);
    Line::through(pos)
        .filter(|line| line.completing_cell(&after, player).is_some())
        .collect()
}

/// Empty cells where `player` would create two simultaneous winning threats.
pub fn fork_cells(board: &Board, player: Player) -> BTreeSet<Position> {
    board
        .empty_positions()
        .into_iter()
        .filter(|pos| threats_created(board, *pos, player).len() >= 2)
        .collect()
}

/// Everything the priority engine needs to know about one board, computed once.
#[derive(Debug, Clone)]
pub(crate) struct TacticalScan {
    pub(crate) wins: BTreeSet<Position>,
    pub(crate) blocks: BTreeSet<Position>,
    pub(crate) opponent_forks: BTreeSet<Position>,
    /// Some empty cell is a forcing move whose forced reply is not a fork cell.
    pub(crate) has_safe_forcing_move: bool,
}

impl TacticalScan {
    pub(crate) fn new(board: &Board, mover: Player) -> Self {
        let opponent = mover.opponent();
        let mut scan = Self {
            wins: winning_cells(board, mover).into_iter().map(|(p, _)| p).collect(),
            blocks: winning_cells(board, opponent).into_iter().map(|(p, _)| p).collect(),
            opponent_forks: fork_cells(board, opponent),
            has_safe_forcing_move: false,
        };
        if !scan.opponent_forks.is_empty() {
            scan.has_safe_forcing_move = board
                .empty_positions()
                .into_iter()
                .any(|pos| scan.is_safe_forcing_move(board, pos, mover));
        }
        scan
    }

    /// A move at `pos` forces the opponent to answer somewhere that does not
    /// hand them a fork.
    pub(crate) fn is_safe_forcing_move(&self, board: &Board, pos: Position, mover: Player) -> bool {
        let threats = threats_created(board, pos, mover);
        if threats.is_empty() {
            return false;
        }
        let after = board.with_mark(pos, mover);
        threats
            .iter()
            .filter_map(|line| line.completing_cell(&after, mover))
            .all(|reply| !self.opponent_forks.contains(&reply))
    }
}
