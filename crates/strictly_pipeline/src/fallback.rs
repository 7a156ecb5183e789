//! The fallback decision table, as pure functions.
//!
//! | failed stage | substitute                                         |
//! |--------------|----------------------------------------------------|
//! | Analysis     | rule-based analysis, no model call                 |
//! | Planning     | the analysis' best opportunity, else best threat   |
//! | Execution    | the plan's primary move, legality-checked, applied |
//!
//! Nothing here suspends or talks to a model.

use crate::agent_result::duration_ms;
use crate::agents::{assess_risk, rule_based_analysis};
use crate::types::{BoardAnalysis, MoveExecution, MoveRecommendation, Strategy, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use strictly_tictactoe::{GameState, MoveError, MovePriority, Position, PriorityEngine, RulesEngine};
use tracing::{debug, instrument};

/// One of the three pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Board analysis.
    Analysis,
    /// Move planning.
    Planning,
    /// Move execution.
    Execution,
}

/// What was substituted for a failed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackStrategy {
    /// Direct priority-engine scan.
    RuleBasedAnalysis,
    /// The analysis' own best opportunity or threat.
    AnalysisTopCandidate,
    /// The plan's primary move applied with minimal checks.
    DirectApply,
}

impl FallbackStrategy {
    /// Substitute used when `stage` fails.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Analysis => FallbackStrategy::RuleBasedAnalysis,
            Stage::Planning => FallbackStrategy::AnalysisTopCandidate,
            Stage::Execution => FallbackStrategy::DirectApply,
        }
    }
}

/// Why a stage produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// The stage ran past its budget and was abandoned.
    TimedOut(Duration),
    /// The stage reported failure.
    Failed(String),
}

impl StageFailure {
    /// Human-readable reason naming the stage.
    pub fn reason(&self, stage: Stage) -> String {
        match self {
            StageFailure::TimedOut(budget) => {
                format!("{} stage timeout after {}ms", stage, duration_ms(*budget))
            }
            StageFailure::Failed(error) => format!("{} stage failed: {}", stage, error),
        }
    }
}

/// A recorded fallback substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRecord {
    /// Stage that failed.
    pub stage: Stage,
    /// Why it failed.
    pub reason: String,
    /// True when the stage ran out of time.
    pub timed_out: bool,
    /// What replaced it.
    pub substituted: FallbackStrategy,
}

impl FallbackRecord {
    /// Records a substitution for `stage`.
    pub fn new(stage: Stage, failure: &StageFailure) -> Self {
        Self {
            stage,
            reason: failure.reason(stage),
            timed_out: matches!(failure, StageFailure::TimedOut(_)),
            substituted: FallbackStrategy::for_stage(stage),
        }
    }
}

/// Substitute analysis: the rule-based scan.
pub fn analysis_fallback(state: &GameState) -> BoardAnalysis {
    rule_based_analysis(state)
}

/// Cell the planning fallback plays, and where it came from.
///
/// Best opportunity first, then best threat. Analyses with neither fall
/// back to the top strategic move, then to the priority engine's own pick.
pub fn planning_fallback_position(state: &GameState, analysis: &BoardAnalysis) -> Option<(Position, &'static str)> {
    if let Some(opportunity) = analysis.best_opportunity() {
        return Some((opportunity.position, "winning opportunity"));
    }
    if let Some(threat) = analysis.best_threat() {
        return Some((threat.position, "critical threat"));
    }
    if let Some(strategic) = analysis.best_strategic_move() {
        return Some((strategic.position, "strategic candidate"));
    }
    PriorityEngine::new()
        .select(state.board(), state.current_turn())
        .map(|scored| (scored.position, "priority engine pick"))
}

/// Substitute plan built straight from the analysis.
///
/// The position is not checked here; the coordinator validates it before
/// execution and reports an illegal cell against the Planning stage.
#[instrument(skip(state, analysis), fields(move_count = state.move_count()))]
pub fn planning_fallback(state: &GameState, analysis: &BoardAnalysis) -> Option<Strategy> {
    let (position, source) = planning_fallback_position(state, analysis)?;
    let primary = match PriorityEngine::new().classify(state.board(), state.current_turn(), position) {
        Some(scored) => {
            let mut recommendation = MoveRecommendation::from(scored);
            recommendation.rationale = format!("Fallback to analysis {}: {}", source, recommendation.rationale);
            recommendation
        }
        None => MoveRecommendation {
            position,
            priority: MovePriority::RandomValid,
            confidence: MovePriority::RandomValid.confidence(),
            rationale: format!("Fallback to analysis {}", source),
            expected_outcome: MovePriority::RandomValid.expected_outcome().to_string(),
        },
    };
    debug!(position = %primary.position, source, "Planning fallback chosen");
    Some(Strategy {
        risk: assess_risk(primary.priority, analysis),
        plan: format!("Fallback: play the analysis {} at {}.", source, position),
        primary,
        alternatives: Vec::new(),
    })
}

/// Substitute execution: check legality, then apply the primary move.
///
/// # Errors
///
/// Returns the [`MoveError`] when the position is illegal; the caller treats
/// that as fatal.
#[instrument(skip(rules, state, strategy), fields(position = %strategy.primary.position))]
pub fn execution_fallback(
    rules: &RulesEngine,
    state: &GameState,
    strategy: &Strategy,
) -> Result<MoveExecution, MoveError> {
    let started = Instant::now();
    let primary = &strategy.primary;
    let mover = state.ai_symbol();
    rules.validate_move(state, primary.position, mover)?;
    let next = rules.apply_move(state, primary.position, mover)?;
    Ok(MoveExecution {
        position: primary.position,
        success: true,
        validation_errors: Vec::<ValidationError>::new(),
        elapsed_ms: duration_ms(started.elapsed()),
        rationale: primary.rationale.clone(),
        priority_used: primary.priority,
        resulting_state: Some(next),
    })
}
