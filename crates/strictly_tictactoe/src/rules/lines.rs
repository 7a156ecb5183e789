//! The eight fixed winning lines.

use crate::position::Position;
use crate::types::{Board, Player, Square};
use serde::{Deserialize, Serialize};

/// One of the 8 winning lines: 3 rows, 3 columns, 2 diagonals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
pub enum Line {
    /// Top row.
    #[serde(rename = "row_0")]
    #[strum(serialize = "row_0")]
    Row0,
    /// Middle row.
    #[serde(rename = "row_1")]
    #[strum(serialize = "row_1")]
    Row1,
    /// Bottom row.
    #[serde(rename = "row_2")]
    #[strum(serialize = "row_2")]
    Row2,
    /// Left column.
    #[serde(rename = "col_0")]
    #[strum(serialize = "col_0")]
    Col0,
    /// Middle column.
    #[serde(rename = "col_1")]
    #[strum(serialize = "col_1")]
    Col1,
    /// Right column.
    #[serde(rename = "col_2")]
    #[strum(serialize = "col_2")]
    Col2,
    /// Top-left to bottom-right.
    #[serde(rename = "diag_main")]
    #[strum(serialize = "diag_main")]
    DiagMain,
    /// Top-right to bottom-left.
    #[serde(rename = "diag_anti")]
    #[strum(serialize = "diag_anti")]
    DiagAnti,
}

impl Line {
    /// All lines, rows first.
    pub const ALL: [Line; 8] = [
        Line::Row0,
        Line::Row1,
        Line::Row2,
        Line::Col0,
        Line::Col1,
        Line::Col2,
        Line::DiagMain,
        Line::DiagAnti,
    ];

    /// The three cells of this line.
    pub fn cells(self) -> [Position; 3] {
        let p = Position::new;
        match self {
            Line::Row0 => [p(0, 0), p(0, 1), p(0, 2)],
            Line::Row1 => [p(1, 0), p(1, 1), p(1, 2)],
            Line::Row2 => [p(2, 0), p(2, 1), p(2, 2)],
            Line::Col0 => [p(0, 0), p(1, 0), p(2, 0)],
            Line::Col1 => [p(0, 1), p(1, 1), p(2, 1)],
            Line::Col2 => [p(0, 2), p(1, 2), p(2, 2)],
            Line::DiagMain => [p(0, 0), p(1, 1), p(2, 2)],
            Line::DiagAnti => [p(0, 2), p(1, 1), p(2, 0)],
        }
    }

    /// True when `pos` lies on this line.
    pub fn contains(self, pos: Position) -> bool {
        self.cells().contains(&pos)
    }

    /// Lines passing through `pos`.
    pub fn through(pos: Position) -> impl Iterator<Item = Line> {
        Self::ALL.into_iter().filter(move |line| line.contains(pos))
    }

    /// Counts `player`'s marks and the empty cells on this line.
    pub fn tally(self, board: &Board, player: Player) -> (usize, usize) {
        self.cells()
            .iter()
            .fold((0, 0), |(mine, empty), pos| match board.get(*pos) {
                Some(Square::Occupied(p)) if p == player => (mine + 1, empty),
                Some(Square::Empty) => (mine, empty + 1),
                _ => (mine, empty),
            })
    }

    /// If `player` holds two cells and the third is empty, returns the empty cell.
    pub fn completing_cell(self, board: &Board, player: Player) -> Option<Position> {
        match self.tally(board, player) {
            (2, 1) => self.cells().into_iter().find(|pos| board.is_empty(*pos)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_through_kinds() {
        assert_eq!(Line::through(Position::CENTER).count(), 4);
        assert_eq!(Line::through(Position::new(0, 0)).count(), 3);
        assert_eq!(Line::through(Position::new(0, 1)).count(), 2);
    }

    #[test]
    fn test_completing_cell() {
        let board = Board::from_rows(["XX.", ".O.", "..."]).unwrap();
        assert_eq!(
            Line::Row0.completing_cell(&board, Player::X),
            Some(Position::new(0, 2))
        );
        assert_eq!(Line::Row0.completing_cell(&board, Player::O), None);
        assert_eq!(Line::Col1.completing_cell(&board, Player::X), None);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(Line::Row0.to_string(), "row_0");
        assert_eq!(Line::DiagAnti.to_string(), "diag_anti");
    }
}
