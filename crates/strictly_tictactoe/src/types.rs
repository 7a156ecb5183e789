//! Core domain types for tic-tac-toe.

use crate::action::MoveError;
use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Player in the game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Player {
    /// Player X (always moves first).
    X,
    /// Player O (moves second).
    O,
}

impl Player {
    /// Returns the opponent player.
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Parses a mover symbol received at a boundary (CLI, model output, wire).
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::InvalidPlayer`] for anything other than `X` or `O`.
    #[instrument]
    pub fn parse(symbol: &str) -> Result<Self, MoveError> {
        Player::from_str(symbol.trim()).map_err(|_| MoveError::InvalidPlayer(symbol.to_string()))
    }
}

/// A square on the tic-tac-toe board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SquareRepr", into = "SquareRepr")]
pub enum Square {
    /// Empty square.
    Empty,
    /// Square occupied by a player.
    Occupied(Player),
}

impl Square {
    /// Returns the occupying player, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            Square::Empty => None,
            Square::Occupied(player) => Some(player),
        }
    }
}

/// Wire form of a square: `"EMPTY"`, `"X"` or `"O"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SquareRepr {
    #[serde(rename = "EMPTY")]
    Empty,
    X,
    O,
}

impl From<SquareRepr> for Square {
    fn from(repr: SquareRepr) -> Self {
        match repr {
            SquareRepr::Empty => Square::Empty,
            SquareRepr::X => Square::Occupied(Player::X),
            SquareRepr::O => Square::Occupied(Player::O),
        }
    }
}

impl From<Square> for SquareRepr {
    fn from(square: Square) -> Self {
        match square {
            Square::Empty => SquareRepr::Empty,
            Square::Occupied(Player::X) => SquareRepr::X,
            Square::Occupied(Player::O) => SquareRepr::O,
        }
    }
}

/// 3x3 tic-tac-toe board.
///
/// Serializes as a 3x3 array of `"EMPTY"`, `"X"` and `"O"`. Mutation is
/// reserved to the rules engine; everything else reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Square; 3]; 3],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Square::Empty; 3]; 3],
        }
    }

    /// Builds a board from three row strings using `X`, `O` and `.` (or `_`, space).
    ///
    /// Intended for fixtures and prompts; no game-legality checks are made.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::InvalidPlayer`] for an unknown cell character and
    /// [`MoveError::OutOfBounds`] for a row that is not exactly three cells.
    #[instrument]
    pub fn from_rows(rows: [&str; 3]) -> Result<Self, MoveError> {
        let mut board = Board::new();
        for (row, text) in rows.iter().enumerate() {
            let chars: Vec<char> = text.chars().collect();
            if chars.len() != 3 {
                return Err(MoveError::OutOfBounds {
                    row: row as u8,
                    col: chars.len() as u8,
                });
            }
            for (col, ch) in chars.into_iter().enumerate() {
                let square = match ch {
                    '.' | '_' | ' ' => Square::Empty,
                    other => Square::Occupied(Player::parse(&other.to_string())?),
                };
                board.cells[row][col] = square;
            }
        }
        Ok(board)
    }

    /// Gets the square at the given position, or `None` when out of bounds.
    pub fn get(&self, pos: Position) -> Option<Square> {
        if !pos.is_in_bounds() {
            return None;
        }
        Some(self.cells[pos.row() as usize][pos.col() as usize])
    }

    /// Sets the square at an in-bounds position.
    pub(crate) fn set(&mut self, pos: Position, square: Square) {
        if pos.is_in_bounds() {
            self.cells[pos.row() as usize][pos.col() as usize] = square;
        }
    }

    /// Returns a copy of the board with `player` placed at `pos`.
    ///
    /// Used for look-ahead; `self` is untouched.
    pub fn with_mark(&self, pos: Position, player: Player) -> Self {
        let mut next = self.clone();
        next.set(pos, Square::Occupied(player));
        next
    }

    /// Checks if a square is empty. Out-of-bounds positions are never empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        matches!(self.get(pos), Some(Square::Empty))
    }

    /// Checks if every square is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|s| *s != Square::Empty)
    }

    /// Counts the marks a player has on the board.
    pub fn count(&self, player: Player) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|s| **s == Square::Occupied(player))
            .count()
    }

    /// Number of occupied squares.
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|s| **s != Square::Empty).count()
    }

    /// Empty positions in row-major order.
    pub fn empty_positions(&self) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|pos| self.is_empty(*pos))
            .collect()
    }

    /// Returns the rows of squares.
    pub fn rows(&self) -> &[[Square; 3]; 3] {
        &self.cells
    }

    /// Formats the board as a human-readable string.
    ///
    /// Empty cells show their `row,col` coordinates so the text can be used
    /// directly in prompts and in the terminal.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3u8 {
            for col in 0..3u8 {
                let symbol = match self.cells[row as usize][col as usize] {
                    Square::Empty => format!("{row},{col}"),
                    Square::Occupied(player) => format!(" {player} "),
                };
                result.push_str(&symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n---+---+---\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "OutcomeRepr", into = "OutcomeRepr")]
pub enum Outcome {
    /// Player won the game.
    Winner(Player),
    /// Game ended in a draw.
    Draw,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Player> {
        match self {
            Outcome::Winner(player) => Some(*player),
            Outcome::Draw => None,
        }
    }

    /// Returns true if the game was a draw.
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(player) => write!(f, "Player {player} wins"),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// Wire form of an outcome: `"X"`, `"O"` or `"DRAW"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum OutcomeRepr {
    X,
    O,
    #[serde(rename = "DRAW")]
    Draw,
}

impl From<OutcomeRepr> for Outcome {
    fn from(repr: OutcomeRepr) -> Self {
        match repr {
            OutcomeRepr::X => Outcome::Winner(Player::X),
            OutcomeRepr::O => Outcome::Winner(Player::O),
            OutcomeRepr::Draw => Outcome::Draw,
        }
    }
}

impl From<Outcome> for OutcomeRepr {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Winner(Player::X) => OutcomeRepr::X,
            Outcome::Winner(Player::O) => OutcomeRepr::O,
            Outcome::Draw => OutcomeRepr::Draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_parse() {
        assert_eq!(Player::parse("x"), Ok(Player::X));
        assert_eq!(Player::parse(" O "), Ok(Player::O));
        assert!(matches!(
            Player::parse("Z"),
            Err(MoveError::InvalidPlayer(s)) if s == "Z"
        ));
    }

    #[test]
    fn test_board_serializes_as_grid() {
        let board = Board::from_rows(["X..", ".O.", "..."]).unwrap();
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                ["X", "EMPTY", "EMPTY"],
                ["EMPTY", "O", "EMPTY"],
                ["EMPTY", "EMPTY", "EMPTY"]
            ])
        );
        let back: Board = serde_json::from_value(json).unwrap();
        assert_eq!(back, board);
    }

    #[test]
    fn test_outcome_wire_form() {
        assert_eq!(serde_json::to_string(&Outcome::Draw).unwrap(), "\"DRAW\"");
        assert_eq!(
            serde_json::to_string(&Outcome::Winner(Player::O)).unwrap(),
            "\"O\""
        );
    }

    #[test]
    fn test_from_rows_rejects_bad_cells() {
        assert!(Board::from_rows(["X.Q", "...", "..."]).is_err());
        assert!(Board::from_rows(["X.", "...", "..."]).is_err());
    }

    #[test]
    fn test_out_of_bounds_square_is_not_empty() {
        let board = Board::new();
        assert!(!board.is_empty(Position::new(3, 0)));
        assert_eq!(board.get(Position::new(0, 7)), None);
    }
}
