//! Planning stage: turns an analysis into a ranked move recommendation.

use super::prompt::{ask, deadline_after, describe_state};
use crate::agent_result::AgentResult;
use crate::config::LlmSettings;
use crate::llm_client::LanguageModel;
use crate::retry::RetryPolicy;
use crate::types::{BoardAnalysis, MoveRecommendation, RiskLevel, Strategy};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use strictly_tictactoe::{GameState, MovePriority, Position, PriorityEngine, ScoredMove};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// The Planning stage contract.
#[async_trait]
pub trait Strategist: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs and fallback records.
    fn name(&self) -> &'static str;

    /// Chooses a move for the player to move.
    async fn plan(&self, state: &GameState, analysis: &BoardAnalysis) -> AgentResult<Strategy>;
}

/// Re-ranks the analysis candidates with the priority engine.
///
/// Falls back to every empty cell when the analysis surfaced nothing.
/// Returns cells best first; empty only when no legal cell exists.
pub fn rank_candidates(state: &GameState, analysis: &BoardAnalysis) -> Vec<ScoredMove> {
    let mut candidates = analysis.candidate_positions();
    if candidates.is_empty() {
        candidates = state.board().empty_positions();
    }
    PriorityEngine::new().rank(state.board(), state.current_turn(), &candidates)
}

/// Risk of playing `primary` given the opponent's standing threats.
pub fn assess_risk(primary: MovePriority, analysis: &BoardAnalysis) -> RiskLevel {
    let threat_cells: BTreeSet<Position> = analysis.threats.iter().map(|t| t.position).collect();
    match primary {
        MovePriority::ImmediateWin | MovePriority::ForceWin => RiskLevel::Low,
        _ if threat_cells.len() >= 2 => RiskLevel::High,
        _ => RiskLevel::Medium,
    }
}

fn build_strategy(ranked: Vec<ScoredMove>, analysis: &BoardAnalysis) -> Option<Strategy> {
    let mut ranked = ranked.into_iter();
    let primary = ranked.next()?;
    let risk = assess_risk(primary.priority, analysis);
    let plan = format!(
        "Play {} ({}): {}.",
        primary.position,
        primary.priority,
        primary.priority.expected_outcome()
    );
    Some(Strategy {
        primary: primary.into(),
        alternatives: ranked.map(MoveRecommendation::from).collect(),
        plan,
        risk,
    })
}

/// Engine-only strategy for the analysis; `None` when no legal cell exists.
#[instrument(skip(state, analysis), fields(move_count = state.move_count()))]
pub fn rule_based_strategy(state: &GameState, analysis: &BoardAnalysis) -> Option<Strategy> {
    build_strategy(rank_candidates(state, analysis), analysis)
}

/// Rule-based strategist.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedStrategist;

#[async_trait]
impl Strategist for RuleBasedStrategist {
    fn name(&self) -> &'static str {
        "rule_based_strategist"
    }

    #[instrument(skip(self, state, analysis))]
    async fn plan(&self, state: &GameState, analysis: &BoardAnalysis) -> AgentResult<Strategy> {
        let started = Instant::now();
        match rule_based_strategy(state, analysis) {
            Some(strategy) => {
                debug!(position = %strategy.primary.position, priority = %strategy.primary.priority, "Strategy chosen");
                AgentResult::ok(strategy, started.elapsed()).with_metadata("model_assisted", json!(false))
            }
            None => AgentResult::failed("No legal candidate moves", None, started.elapsed()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StrategistReply {
    row: u8,
    col: u8,
    rationale: Option<String>,
    #[serde(default)]
    alternatives: Vec<CellRef>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct CellRef {
    row: u8,
    col: u8,
}

const STRATEGIST_SYSTEM_PROMPT: &str = "You are a tic-tac-toe strategist. Choose one move from the \
listed best candidates and explain it in one sentence. You may also order the other candidates. \
Reply with one JSON object: {\"row\": n, \"col\": n, \"rationale\": string, \
\"alternatives\": [{\"row\": n, \"col\": n}]}";

/// Strategist that lets a model pick among the engine's best cells.
///
/// The model can only choose within the highest priority level the engine
/// found. Anything else is rejected and the engine's own choice stands.
#[derive(Debug, Clone)]
pub struct ModelAssistedStrategist {
    model: Arc<dyn LanguageModel>,
    settings: LlmSettings,
    retry: RetryPolicy,
    budget: Duration,
}

impl ModelAssistedStrategist {
    /// Creates a strategist that must finish within `budget`.
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

    fn prompt(state: &GameState, analysis: &BoardAnalysis, ranked: &[ScoredMove]) -> String {
        let top = ranked.first().map(|m| m.priority);
        let best = ranked
            .iter()
            .filter(|m| Some(m.priority) == top)
            .map(|m| format!("- {} {}: {}", m.position, m.priority, m.rationale))
            .collect::<Vec<_>>()
            .join("\n");
        let others = ranked
            .iter()
            .filter(|m| Some(m.priority) != top)
            .map(|m| format!("- {} {}", m.position, m.priority))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\nAnalysis: {}\nBest candidates:\n{}\nOther candidates:\n{}",
            describe_state(state),
            analysis.summary,
            best,
            if others.is_empty() { "- none".to_string() } else { others }
        )
    }

    /// Applies the model's pick and ordering to the engine ranking.
    ///
    /// Returns the strategy and whether the model's pick was accepted.
    fn refine(
        mut ranked: Vec<ScoredMove>,
        analysis: &BoardAnalysis,
        reply: StrategistReply,
    ) -> Option<(Strategy, bool)> {
        let top = ranked.first()?.priority;
        let chosen = Position::new(reply.row, reply.col);
        let accepted = match ranked
            .iter()
            .position(|m| m.position == chosen && m.priority == top)
        {
            Some(index) => {
                let mut pick = ranked.remove(index);
                if let Some(rationale) = reply.rationale.filter(|r| !r.trim().is_empty()) {
                    pick.rationale = rationale;
                }
                ranked.insert(0, pick);
                true
            }
            None => false,
        };

        if ranked.len() > 1 {
            let order: Vec<Position> = reply
                .alternatives
                .iter()
                .map(|c| Position::new(c.row, c.col))
                .collect();
            let model_rank = |pos: Position| order.iter().position(|&p| p == pos).unwrap_or(usize::MAX);
            // Stable: engine order breaks ties the model left open.
            ranked[1..].sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| model_rank(a.position).cmp(&model_rank(b.position)))
            });
        }

        build_strategy(ranked, analysis).map(|strategy| (strategy, accepted))
    }
}

#[async_trait]
impl Strategist for ModelAssistedStrategist {
    fn name(&self) -> &'static str {
        "model_assisted_strategist"
    }

    #[instrument(skip(self, state, analysis), fields(model = %self.settings.model()))]
    async fn plan(&self, state: &GameState, analysis: &BoardAnalysis) -> AgentResult<Strategy> {
        let started = Instant::now();
        let deadline = deadline_after(started, self.budget);
        let ranked = rank_candidates(state, analysis);
        if ranked.is_empty() {
            return AgentResult::failed("No legal candidate moves", None, started.elapsed());
        }

        let reply = ask::<StrategistReply>(
            self.model.as_ref(),
            &self.settings,
            self.retry,
            deadline,
            STRATEGIST_SYSTEM_PROMPT,
            Self::prompt(state, analysis, &ranked),
        )
        .await;

        match reply {
            Ok((reply, generation)) => match Self::refine(ranked, analysis, reply) {
                Some((strategy, accepted)) => {
                    if accepted {
                        info!(position = %strategy.primary.position, "Model pick accepted");
                    } else {
                        warn!(position = %strategy.primary.position, "Model pick outside top priority level, keeping engine choice");
                    }
                    AgentResult::ok(strategy, started.elapsed())
                        .with_metadata("model_assisted", json!(true))
                        .with_metadata("model_pick_accepted", json!(accepted))
                        .with_metadata("tokens_used", json!(generation.tokens_used()))
                }
                None => AgentResult::failed("No legal candidate moves", None, started.elapsed()),
            },
            Err(err) => {
                warn!(error = %err, "Model planning failed");
                AgentResult::failed(err.to_string(), None, started.elapsed())
                    .with_metadata("model_assisted", json!(false))
                    .with_metadata("error_kind", json!(err.kind.to_string()))
            }
        }
    }
}
