//! Board coordinates for tic-tac-toe moves.

use crate::action::MoveError;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A `(row, col)` coordinate on the board.
///
/// Positions are plain values: they may be constructed out of bounds (for
/// example when parsed from model output) and are bounds-checked by the
/// rules engine. Ordering is lexicographic, row then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: u8,
    col: u8,
}

/// Structural class of a cell, by how many lines pass through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PositionKind {
    /// The middle cell; four lines.
    Center,
    /// One of the four corners; three lines.
    Corner,
    /// One of the four edge midpoints; two lines.
    Edge,
}

impl PositionKind {
    /// Tie-break preference: center > corner > edge.
    pub fn preference(self) -> u8 {
        match self {
            PositionKind::Center => 3,
            PositionKind::Corner => 2,
            PositionKind::Edge => 1,
        }
    }

    /// Number of winning lines through a cell of this kind.
    pub fn line_count(self) -> usize {
        match self {
            PositionKind::Center => 4,
            PositionKind::Corner => 3,
            PositionKind::Edge => 2,
        }
    }
}

impl Position {
    /// The center cell.
    pub const CENTER: Position = Position::new(1, 1);

    /// The four corners, in row-major order.
    pub const CORNERS: [Position; 4] = [
        Position::new(0, 0),
        Position::new(0, 2),
        Position::new(2, 0),
        Position::new(2, 2),
    ];

    /// The four edge midpoints, in row-major order.
    pub const EDGES: [Position; 4] = [
        Position::new(0, 1),
        Position::new(1, 0),
        Position::new(1, 2),
        Position::new(2, 1),
    ];

    /// All 9 positions in row-major order.
    pub const ALL: [Position; 9] = [
        Position::new(0, 0),
        Position::new(0, 1),
        Position::new(0, 2),
        Position::new(1, 0),
        Position::new(1, 1),
        Position::new(1, 2),
        Position::new(2, 0),
        Position::new(2, 1),
        Position::new(2, 2),
    ];

    /// Creates a position without bounds checking.
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Creates a position, rejecting coordinates outside `[0, 2]`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::OutOfBounds`] if either coordinate exceeds 2.
    #[instrument]
    pub fn try_new(row: u8, col: u8) -> Result<Self, MoveError> {
        let pos = Self::new(row, col);
        if pos.is_in_bounds() {
            Ok(pos)
        } else {
            Err(MoveError::OutOfBounds { row, col })
        }
    }

    /// Row index.
    pub fn row(self) -> u8 {
        self.row
    }

    /// Column index.
    pub fn col(self) -> u8 {
        self.col
    }

    /// True when both coordinates are within `[0, 2]`.
    pub fn is_in_bounds(self) -> bool {
        self.row < 3 && self.col < 3
    }

    /// Row-major index (0-8), if in bounds.
    pub fn to_index(self) -> Option<usize> {
        self.is_in_bounds()
            .then(|| self.row as usize * 3 + self.col as usize)
    }

    /// Creates position from row-major index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Structural class of this cell, if in bounds.
    pub fn kind(self) -> Option<PositionKind> {
        if !self.is_in_bounds() {
            None
        } else if self == Self::CENTER {
            Some(PositionKind::Center)
        } else if self.row != 1 && self.col != 1 {
            Some(PositionKind::Corner)
        } else {
            Some(PositionKind::Edge)
        }
    }

    /// Get label for this position (for display).
    pub fn label(self) -> &'static str {
        match (self.row, self.col) {
            (0, 0) => "Top-left",
            (0, 1) => "Top-center",
            (0, 2) => "Top-right",
            (1, 0) => "Middle-left",
            (1, 1) => "Center",
            (1, 2) => "Middle-right",
            (2, 0) => "Bottom-left",
            (2, 1) => "Bottom-center",
            (2, 2) => "Bottom-right",
            _ => "Off-board",
        }
    }

    /// Parses `"row col"`, `"row,col"`, `"(row, col)"` or a label such as `"top-left"`.
    ///
    /// Coordinates are returned even when out of bounds so the rules engine
    /// can report the precise error. Numbers too large for a coordinate
    /// saturate to `u8::MAX`, which is always out of bounds.
    #[instrument]
    pub fn parse(s: &str) -> Option<Position> {
        let cleaned: String = s
            .chars()
            .map(|c| if c.is_ascii_digit() { c } else { ' ' })
            .collect();
        let numbers: Vec<u8> = cleaned
            .split_whitespace()
            .map(|part| {
                part.parse::<u64>()
                    .ok()
                    .and_then(|n| u8::try_from(n).ok())
                    .unwrap_or(u8::MAX)
            })
            .collect();
        if let [row, col] = numbers.as_slice() {
            return Some(Position::new(*row, *col));
        }

        let wanted = s.trim().to_lowercase().replace(' ', "-");
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|pos| pos.label().to_lowercase() == wanted)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
