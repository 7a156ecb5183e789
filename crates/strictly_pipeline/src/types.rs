//! Stage payloads: what Analysis, Planning and Execution hand each other.

use serde::{Deserialize, Serialize};
use strictly_tictactoe::{GameState, Line, MoveError, MovePriority, Position, PositionKind, ScoredMove};

/// How urgent a threat is. Every one-move loss is critical.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// The opponent wins next turn unless this cell is taken.
    #[default]
    Critical,
}

/// A line the opponent can complete next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct Threat {
    /// Cell to block.
    pub position: Position,
    /// The threatening line.
    pub line: Line,
    /// Always critical.
    pub severity: Severity,
}

/// A line the mover can complete now.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct Opportunity {
    /// Winning cell.
    pub position: Position,
    /// The line it completes.
    pub line: Line,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Kind of a non-immediate candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StrategicKind {
    /// The center cell.
    Center,
    /// A corner cell.
    Corner,
    /// An edge cell.
    Edge,
    /// Creates a double threat.
    Fork,
    /// Denies the opponent a double threat.
    ForkBlock,
}

impl StrategicKind {
    /// Strategic kind for a classified move.
    pub fn from_scored(scored: &ScoredMove) -> Self {
        match scored.priority {
            MovePriority::ForceWin => StrategicKind::Fork,
            MovePriority::PreventFork => StrategicKind::ForkBlock,
            _ => match scored.kind {
                PositionKind::Center => StrategicKind::Center,
                PositionKind::Corner => StrategicKind::Corner,
                PositionKind::Edge => StrategicKind::Edge,
            },
        }
    }
}

/// A non-immediate candidate move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicMove {
    /// The cell.
    pub position: Position,
    /// What kind of play it is.
    pub kind: StrategicKind,
    /// Rank from 1 (weakest) to 10 (strongest).
    pub priority: u8,
    /// Why it is worth considering.
    pub rationale: String,
}

impl StrategicMove {
    /// Builds a candidate from a classified move, ranking by priority value.
    pub fn from_scored(scored: &ScoredMove) -> Self {
        Self {
            position: scored.position,
            kind: StrategicKind::from_scored(scored),
            priority: (scored.priority.value() / 10).clamp(1, 10),
            rationale: scored.rationale.clone(),
        }
    }
}

/// Coarse game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GamePhase {
    /// At most two marks placed.
    Opening,
    /// Three to five marks placed.
    Midgame,
    /// Six or more marks placed.
    Endgame,
}

impl GamePhase {
    /// Phase by number of moves played.
    pub fn from_move_count(move_count: u32) -> Self {
        match move_count {
            0..=2 => GamePhase::Opening,
            3..=5 => GamePhase::Midgame,
            _ => GamePhase::Endgame,
        }
    }
}

/// Output of the Analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardAnalysis {
    /// Opponent lines to block.
    pub threats: Vec<Threat>,
    /// Mover lines to complete.
    pub opportunities: Vec<Opportunity>,
    /// Remaining candidates, strongest first.
    pub strategic_moves: Vec<StrategicMove>,
    /// One-paragraph description.
    pub summary: String,
    /// Game phase.
    pub phase: GamePhase,
    /// Position value for the mover in `[-1, 1]`.
    pub evaluation: f64,
}

impl BoardAnalysis {
    /// Opportunity with the highest confidence, lowest position on ties.
    pub fn best_opportunity(&self) -> Option<&Opportunity> {
        self.opportunities.iter().min_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.position.cmp(&b.position))
        })
    }

    /// Most severe threat, lowest position on ties.
    pub fn best_threat(&self) -> Option<&Threat> {
        self.threats.iter().min_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.position.cmp(&b.position))
        })
    }

    /// Highest-ranked strategic move, lowest position on ties.
    pub fn best_strategic_move(&self) -> Option<&StrategicMove> {
        self.strategic_moves.iter().min_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.position.cmp(&b.position))
        })
    }

    /// Every cell the analysis surfaced, deduplicated and sorted.
    pub fn candidate_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .opportunities
            .iter()
            .map(|o| o.position)
            .chain(self.threats.iter().map(|t| t.position))
            .chain(self.strategic_moves.iter().map(|s| s.position))
            .collect();
        positions.sort();
        positions.dedup();
        positions
    }
}

/// A concrete move suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecommendation {
    /// The cell.
    pub position: Position,
    /// Priority level of the cell.
    pub priority: MovePriority,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Why.
    pub rationale: String,
    /// What the move should achieve.
    pub expected_outcome: String,
}

impl From<ScoredMove> for MoveRecommendation {
    fn from(scored: ScoredMove) -> Self {
        Self {
            position: scored.position,
            priority: scored.priority,
            confidence: scored.confidence,
            expected_outcome: scored.priority.expected_outcome().to_string(),
            rationale: scored.rationale,
        }
    }
}

/// Risk of the chosen plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    /// Winning or forcing play.
    Low,
    /// Positional play.
    Medium,
    /// The opponent still has more threats than one move can stop.
    High,
}

/// Output of the Planning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// The move to play.
    pub primary: MoveRecommendation,
    /// Other candidates, descending priority.
    pub alternatives: Vec<MoveRecommendation>,
    /// Overall plan.
    pub plan: String,
    /// Risk tag.
    pub risk: RiskLevel,
}

/// One failed legality check, as reported by the Execution stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Stable kind, e.g. `cell_occupied`.
    pub kind: String,
    /// Human-readable reason.
    pub message: String,
}

impl From<&MoveError> for ValidationError {
    fn from(err: &MoveError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Output of the Execution stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveExecution {
    /// Cell that was (or would have been) played.
    pub position: Position,
    /// Whether the move was applied.
    pub success: bool,
    /// Failed checks; empty on success.
    pub validation_errors: Vec<ValidationError>,
    /// Stage wall time.
    pub elapsed_ms: u64,
    /// Why this move.
    pub rationale: String,
    /// Priority level the move was played at.
    pub priority_used: MovePriority,
    /// Successor state, present only when the move was applied.
    #[serde(skip)]
    pub resulting_state: Option<GameState>,
}
