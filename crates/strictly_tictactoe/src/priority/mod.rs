//! Deterministic move selection over eight fixed priority levels.
//!
//! Every empty cell is classified at the highest level it qualifies for,
//! then candidates are ordered by:
//!
//! 1. priority value
//! 2. confidence
//! 3. cell kind (center > corner > edge)
//! 4. position (row, then column)
//!
//! The engine is pure: the same board and mover always produce the same move.

mod tactics;

pub use tactics::{fork_cells, threats_created, winning_cells};

use crate::position::{Position, PositionKind};
use crate::types::{Board, Player};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tactics::TacticalScan;
use tracing::{debug, instrument};

/// Priority level of a candidate move, highest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MovePriority {
    /// Completes a line for the mover.
    ImmediateWin,
    /// Stops the opponent completing a line next turn.
    BlockThreat,
    /// Creates two unblocked winning threats at once.
    ForceWin,
    /// Denies the opponent a fork on their next move.
    PreventFork,
    /// Takes the empty center.
    CenterControl,
    /// Takes a corner.
    CornerControl,
    /// Takes an edge.
    EdgePlay,
    /// Any other legal cell.
    RandomValid,
}

impl MovePriority {
    /// Levels in descending order.
    pub const DESCENDING: [MovePriority; 8] = [
        MovePriority::ImmediateWin,
        MovePriority::BlockThreat,
        MovePriority::ForceWin,
        MovePriority::PreventFork,
        MovePriority::CenterControl,
        MovePriority::CornerControl,
        MovePriority::EdgePlay,
        MovePriority::RandomValid,
    ];

    /// Fixed integer weight.
    pub fn value(self) -> u8 {
        match self {
            MovePriority::ImmediateWin => 100,
            MovePriority::BlockThreat => 90,
            MovePriority::ForceWin => 80,
            MovePriority::PreventFork => 70,
            MovePriority::CenterControl => 50,
            MovePriority::CornerControl => 40,
            MovePriority::EdgePlay => 30,
            MovePriority::RandomValid => 10,
        }
    }

    /// Confidence attached to a move at this level.
    pub fn confidence(self) -> f64 {
        match self {
            MovePriority::ImmediateWin | MovePriority::BlockThreat => 1.0,
            MovePriority::ForceWin => 0.95,
            MovePriority::PreventFork => 0.85,
            MovePriority::CenterControl => 0.75,
            MovePriority::CornerControl => 0.60,
            MovePriority::EdgePlay => 0.40,
            MovePriority::RandomValid => 0.20,
        }
    }

    /// Short description of what a move at this level achieves.
    pub fn expected_outcome(self) -> &'static str {
        match self {
            MovePriority::ImmediateWin => "Wins the game immediately",
            MovePriority::BlockThreat => "Prevents the opponent from winning next turn",
            MovePriority::ForceWin => "Creates two threats; the opponent can only block one",
            MovePriority::PreventFork => "Denies the opponent a double threat",
            MovePriority::CenterControl => "Controls the cell shared by four lines",
            MovePriority::CornerControl => "Controls a cell shared by three lines",
            MovePriority::EdgePlay => "Keeps two lines open",
            MovePriority::RandomValid => "Keeps the game going",
        }
    }
}

impl PartialOrd for MovePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MovePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

/// A legal cell classified at its highest qualifying level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMove {
    /// The cell.
    pub position: Position,
    /// Highest level the cell qualifies for.
    pub priority: MovePriority,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Structural class of the cell.
    pub kind: PositionKind,
    /// Why the cell qualifies.
    pub rationale: String,
}

impl ScoredMove {
    /// Total order used for selection: best move sorts first.
    pub fn ranking(a: &ScoredMove, b: &ScoredMove) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| b.kind.preference().cmp(&a.kind.preference()))
            .then_with(|| a.position.cmp(&b.position))
    }
}

/// Deterministic priority engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityEngine;

impl PriorityEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }

    /// Picks the single best move for `mover`.
    ///
    /// Returns `None` only when the board has no empty cell.
    #[instrument(skip(self, board))]
    pub fn select(&self, board: &Board, mover: Player) -> Option<ScoredMove> {
        let best = self.evaluate(board, mover).into_iter().next();
        if let Some(choice) = &best {
            debug!(
                position = %choice.position,
                priority = %choice.priority,
                confidence = choice.confidence,
                "Priority engine selected move"
            );
        }
        best
    }

    /// Every empty cell, classified and sorted best-first.
    #[instrument(skip(self, board))]
    pub fn evaluate(&self, board: &Board, mover: Player) -> Vec<ScoredMove> {
        self.rank(board, mover, &board.empty_positions())
    }

    /// Classifies and sorts the given candidates; occupied or off-board
    /// candidates are dropped, duplicates collapse.
    #[instrument(skip(self, board))]
    pub fn rank(&self, board: &Board, mover: Player, candidates: &[Position]) -> Vec<ScoredMove> {
        let scan = TacticalScan::new(board, mover);
        let mut unique = candidates.to_vec();
        unique.sort();
        unique.dedup();
        let mut scored: Vec<ScoredMove> = unique
            .into_iter()
            .filter_map(|pos| classify_with(&scan, board, mover, pos))
            .collect();
        scored.sort_by(ScoredMove::ranking);
        scored
    }

    /// Classifies one cell; `None` when it is not a legal target.
    pub fn classify(&self, board: &Board, mover: Player, pos: Position) -> Option<ScoredMove> {
        classify_with(&TacticalScan::new(board, mover), board, mover, pos)
    }
}

fn classify_with(
    scan: &TacticalScan,
    board: &Board,
    mover: Player,
    pos: Position,
) -> Option<ScoredMove> {
    if !board.is_empty(pos) {
        return None;
    }
    let kind = pos.kind()?;
    let opponent = mover.opponent();

    let (priority, confidence, rationale) = if scan.wins.contains(&pos) {
        let level = MovePriority::ImmediateWin;
        (level, level.confidence(), format!("{mover} completes a line at {pos}"))
    } else if scan.blocks.contains(&pos) {
        let level = MovePriority::BlockThreat;
        (level, level.confidence(), format!("{opponent} would complete a line at {pos}"))
    } else if tactics::threats_created(board, pos, mover).len() >= 2 {
        let level = MovePriority::ForceWin;
        (level, level.confidence(), format!("{pos} opens two winning lines for {mover}"))
    } else if prevents_fork(scan, board, mover, pos) {
        let level = MovePriority::PreventFork;
        (level, level.confidence(), format!("{pos} keeps {opponent} from forking"))
    } else {
        let level = match kind {
            PositionKind::Center => MovePriority::CenterControl,
            PositionKind::Corner => MovePriority::CornerControl,
            PositionKind::Edge => MovePriority::EdgePlay,
        };
        (
            level,
            level.confidence(),
            format!("{} {} on {} lines", pos.label(), kind, kind.line_count()),
        )
    };

    Some(ScoredMove {
        position: pos,
        priority,
        confidence,
        kind,
        rationale,
    })
}

/// A forcing move whose forced reply gives the opponent no fork always
/// qualifies. Occupying a fork cell qualifies when it is the opponent's only
/// one, or when no such forcing move exists.
fn prevents_fork(scan: &TacticalScan, board: &Board, mover: Player, pos: Position) -> bool {
    if scan.opponent_forks.is_empty() {
        return false;
    }
    if scan.is_safe_forcing_move(board, pos, mover) {
        return true;
    }
    scan.opponent_forks.contains(&pos)
        && (scan.opponent_forks.len() == 1 || !scan.has_safe_forcing_move)
}
