//! Analysis stage: threats, opportunities and strategic candidates.

use super::prompt::{ask, deadline_after, describe_state};
use crate::agent_result::AgentResult;
use crate::config::LlmSettings;
use crate::llm_client::LanguageModel;
use crate::retry::RetryPolicy;
use crate::types::{BoardAnalysis, GamePhase, Opportunity, Severity, StrategicMove, Threat};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strictly_tictactoe::{
    GameState, Line, MovePriority, Player, PriorityEngine, Position, Square, winning_cells,
};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// The Analysis stage contract.
#[async_trait]
pub trait Scout: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs and fallback records.
    fn name(&self) -> &'static str;

    /// Analyzes the position for the player to move.
    async fn analyze(&self, state: &GameState) -> AgentResult<BoardAnalysis>;
}

/// Priority-engine scan of the position; no model involved.
///
/// Threats and opportunities come straight from line scans. Every other
/// legal cell becomes a strategic candidate ranked by its priority level.
#[instrument(skip(state), fields(move_count = state.move_count()))]
pub fn rule_based_analysis(state: &GameState) -> BoardAnalysis {
    let board = state.board();
    let mover = state.current_turn();

    let opportunities: Vec<Opportunity> = winning_cells(board, mover)
        .into_iter()
        .map(|(position, line)| Opportunity::new(position, line, MovePriority::ImmediateWin.confidence()))
        .collect();
    let threats: Vec<Threat> = winning_cells(board, mover.opponent())
        .into_iter()
        .map(|(position, line)| Threat::new(position, line, Severity::Critical))
        .collect();

    let strategic_moves: Vec<StrategicMove> = if state.is_terminal() {
        Vec::new()
    } else {
        PriorityEngine::new()
            .evaluate(board, mover)
            .iter()
            .filter(|scored| {
                !matches!(
                    scored.priority,
                    MovePriority::ImmediateWin | MovePriority::BlockThreat
                )
            })
            .map(StrategicMove::from_scored)
            .collect()
    };

    let summary = format!(
        "{} to move: {} winning move(s), {} threat(s) to block, {} strategic option(s).",
        mover,
        opportunities.len(),
        threats.len(),
        strategic_moves.len()
    );
    let evaluation = evaluate(state, mover, &opportunities, &threats);

    debug!(
        opportunities = opportunities.len(),
        threats = threats.len(),
        evaluation,
        "Board analyzed"
    );
    BoardAnalysis {
        threats,
        opportunities,
        strategic_moves,
        summary,
        phase: GamePhase::from_move_count(state.move_count()),
        evaluation,
    }
}

fn evaluate(state: &GameState, mover: Player, opportunities: &[Opportunity], threats: &[Threat]) -> f64 {
    if let Some(outcome) = state.winner() {
        return match outcome.winner() {
            Some(winner) if winner == mover => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        };
    }
    if !opportunities.is_empty() {
        return 0.9;
    }
    let distinct_threats = threats
        .iter()
        .map(|t| t.position)
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    if distinct_threats >= 2 {
        return -0.9;
    }

    let open = |player: Player| {
        Line::ALL
            .iter()
            .filter(|line| {
                line.cells()
                    .iter()
                    .all(|&cell| state.board().get(cell) != Some(Square::Occupied(player.opponent())))
            })
            .count() as f64
    };
    let positional = (open(mover) - open(mover.opponent())) / Line::ALL.len() as f64;
    let pressure = if distinct_threats == 1 { 0.3 } else { 0.0 };
    (positional - pressure).clamp(-1.0, 1.0)
}

/// Rule-based scout.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScout;

#[async_trait]
impl Scout for RuleBasedScout {
    fn name(&self) -> &'static str {
        "rule_based_scout"
    }

    #[instrument(skip(self, state))]
    async fn analyze(&self, state: &GameState) -> AgentResult<BoardAnalysis> {
        let started = Instant::now();
        let analysis = rule_based_analysis(state);
        AgentResult::ok(analysis, started.elapsed()).with_metadata("model_assisted", json!(false))
    }
}

/// What the model may contribute to an analysis.
#[derive(Debug, Clone, Deserialize)]
struct ScoutReply {
    summary: Option<String>,
    phase: Option<GamePhase>,
    evaluation: Option<f64>,
    #[serde(default)]
    insights: Vec<CellInsight>,
}

#[derive(Debug, Clone, Deserialize)]
struct CellInsight {
    row: u8,
    col: u8,
    rationale: String,
}

const SCOUT_SYSTEM_PROMPT: &str = "You are a tic-tac-toe analyst. Threats and winning moves are \
already computed. Describe the position and comment on the listed candidate cells. Reply with one \
JSON object: {\"summary\": string, \"phase\": \"opening\"|\"midgame\"|\"endgame\", \
\"evaluation\": number between -1 and 1 for the player to move, \
\"insights\": [{\"row\": n, \"col\": n, \"rationale\": string}]}";

/// Scout that runs the rule-based scan, then asks a model to enrich it.
///
/// The model may rewrite the summary, phase, evaluation and candidate
/// rationales. Threats and opportunities always come from the scan, and a
/// model failure leaves them intact in the partial result.
#[derive(Debug, Clone)]
pub struct ModelAssistedScout {
    model: Arc<dyn LanguageModel>,
    settings: LlmSettings,
    retry: RetryPolicy,
    budget: Duration,
}

impl ModelAssistedScout {
    /// Creates a scout that must finish within `budget`.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        settings: LlmSettings,
        retry: RetryPolicy,
        budget: Duration,
    ) -> Self {
        Self {
            model,
            settings,
            retry,
            budget,
        }
    }

    fn prompt(state: &GameState, analysis: &BoardAnalysis) -> String {
        let candidates = analysis
            .strategic_moves
            .iter()
            .map(|m| format!("- {} {} (rank {}): {}", m.position, m.kind, m.priority, m.rationale))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\nComputed: {}\nCandidates:\n{}",
            describe_state(state),
            analysis.summary,
            if candidates.is_empty() { "- none".to_string() } else { candidates }
        )
    }

    fn merge(mut analysis: BoardAnalysis, reply: ScoutReply) -> BoardAnalysis {
        if let Some(summary) = reply.summary.filter(|s| !s.trim().is_empty()) {
            analysis.summary = summary;
        }
        if let Some(phase) = reply.phase {
            analysis.phase = phase;
        }
        if let Some(evaluation) = reply.evaluation.filter(|e| e.is_finite()) {
            analysis.evaluation = evaluation.clamp(-1.0, 1.0);
        }
        for insight in reply.insights {
            let position = Position::new(insight.row, insight.col);
            if let Some(candidate) = analysis
                .strategic_moves
                .iter_mut()
                .find(|m| m.position == position)
            {
                candidate.rationale = insight.rationale;
            }
        }
        analysis
    }
}

#[async_trait]
impl Scout for ModelAssistedScout {
    fn name(&self) -> &'static str {
        "model_assisted_scout"
    }

    #[instrument(skip(self, state), fields(model = %self.settings.model()))]
    async fn analyze(&self, state: &GameState) -> AgentResult<BoardAnalysis> {
        let started = Instant::now();
        let deadline = deadline_after(started, self.budget);
        let base = rule_based_analysis(state);

        let reply = ask::<ScoutReply>(
            self.model.as_ref(),
            &self.settings,
            self.retry,
            deadline,
            SCOUT_SYSTEM_PROMPT,
            Self::prompt(state, &base),
        )
        .await;

        match reply {
            Ok((reply, generation)) => {
                debug!(tokens = generation.tokens_used(), "Analysis enriched by model");
                AgentResult::ok(Self::merge(base, reply), started.elapsed())
                    .with_metadata("model_assisted", json!(true))
                    .with_metadata("tokens_used", json!(generation.tokens_used()))
                    .with_metadata("latency_ms", json!(generation.latency_ms()))
            }
            Err(err) => {
                warn!(error = %err, "Model analysis failed");
                AgentResult::failed(err.to_string(), Some(base), started.elapsed())
                    .with_metadata("model_assisted", json!(false))
                    .with_metadata("error_kind", json!(err.kind.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_tictactoe::{Board, RulesEngine};

    fn state_after(moves: &[(u8, u8)]) -> GameState {
        let positions: Vec<Position> = moves.iter().map(|&(r, c)| Position::new(r, c)).collect();
        RulesEngine::default().replay(Player::O, &positions).unwrap()
    }

    #[test]
    fn test_empty_board_analysis() {
        let analysis = rule_based_analysis(&state_after(&[]));
        assert!(analysis.threats.is_empty());
        assert!(analysis.opportunities.is_empty());
        assert_eq!(analysis.strategic_moves.len(), 9);
        assert_eq!(analysis.phase, GamePhase::Opening);
        assert_eq!(analysis.evaluation, 0.0);
        assert_eq!(analysis.best_strategic_move().unwrap().position, Position::CENTER);
    }

    #[test]
    fn test_finds_opportunity_and_threat() {
        // X: (0,0) (0,1); O: (1,0) (1,1); X to move
        let state = state_after(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let analysis = rule_based_analysis(&state);
        assert_eq!(analysis.opportunities.len(), 1);
        assert_eq!(analysis.opportunities[0].position, Position::new(0, 2));
        assert_eq!(analysis.opportunities[0].line, Line::Row0);
        assert_eq!(analysis.threats.len(), 1);
        assert_eq!(analysis.threats[0].position, Position::new(1, 2));
        assert_eq!(analysis.threats[0].severity, Severity::Critical);
        assert!(analysis.evaluation > 0.5);
        assert!(
            analysis
                .strategic_moves
                .iter()
                .all(|m| m.position != Position::new(0, 2) && m.position != Position::new(1, 2))
        );
    }

    #[test]
    fn test_board_unchanged_by_analysis() {
        let state = state_after(&[(1, 1)]);
        let before: Board = state.board().clone();
        let _ = rule_based_analysis(&state);
        assert_eq!(state.board(), &before);
    }

    #[test]
    fn test_merge_keeps_scanned_lines() {
        let state = state_after(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let base = rule_based_analysis(&state);
        let reply = ScoutReply {
            summary: Some("X wins on the top row.".to_string()),
            phase: Some(GamePhase::Endgame),
            evaluation: Some(4.0),
            insights: vec![CellInsight {
                row: 2,
                col: 2,
                rationale: "keeps the diagonal".to_string(),
            }],
        };
        let merged = ModelAssistedScout::merge(base.clone(), reply);
        assert_eq!(merged.threats, base.threats);
        assert_eq!(merged.opportunities, base.opportunities);
        assert_eq!(merged.summary, "X wins on the top row.");
        assert_eq!(merged.phase, GamePhase::Endgame);
        assert_eq!(merged.evaluation, 1.0);
        let corner = merged
            .strategic_moves
            .iter()
            .find(|m| m.position == Position::new(2, 2))
            .unwrap();
        assert_eq!(corner.rationale, "keeps the diagonal");
    }

    #[tokio::test]
    async fn test_rule_based_scout_reports_success() {
        let result = RuleBasedScout.analyze(&state_after(&[])).await;
        assert!(result.is_success());
        assert!(!result.flag("model_assisted"));
    }
}
