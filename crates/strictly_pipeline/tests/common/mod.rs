//! Scripted stage and model doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use strictly_pipeline::{
    AgentResult, BoardAnalysis, Executor, Generation, GenerationRequest, LanguageModel, LlmError,
    LlmErrorKind, MoveExecution, MoveExecutor, MoveRecommendation, PipelineConfig, RetrySettings,
    RiskLevel, Scout, StageTimeouts, Strategist, Strategy, rule_based_analysis,
    rule_based_strategy,
};
use strictly_tictactoe::{GameState, MovePriority, Player, Position, RulesEngine};

/// Short budgets so timeout paths finish quickly.
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_timeouts(
            StageTimeouts::default()
                .with_analysis_ms(100)
                .with_planning_ms(100)
                .with_execution_ms(100)
                .with_buffer_ms(100),
        )
        .with_retry(
            RetrySettings::default()
                .with_max_attempts(3)
                .with_base_backoff_ms(1),
        )
}

/// Replays `moves` from a new game where the human plays O.
pub fn ai_x_after(moves: &[(u8, u8)]) -> GameState {
    let positions: Vec<Position> = moves.iter().map(|&(r, c)| Position::new(r, c)).collect();
    RulesEngine::default()
        .replay(Player::O, &positions)
        .expect("legal test moves")
}

/// Answers every prompt with the same text.
#[derive(Debug, Default)]
pub struct FixedModel {
    text: String,
    calls: AtomicU32,
}

impl FixedModel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for FixedModel {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Generation::new(self.text.clone(), 42, 1))
    }
}

/// Answers analysis and planning prompts differently.
#[derive(Debug)]
pub struct RoutedModel {
    pub analysis: String,
    pub planning: String,
}

#[async_trait]
impl LanguageModel for RoutedModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let text = if request.system_prompt().contains("strategist") {
            &self.planning
        } else {
            &self.analysis
        };
        Ok(Generation::new(text.clone(), 10, 1))
    }
}

/// Sleeps before answering.
#[derive(Debug)]
pub struct DelayedModel {
    pub delay: Duration,
    pub text: String,
}

#[async_trait]
impl LanguageModel for DelayedModel {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, LlmError> {
        tokio::time::sleep(self.delay).await;
        Ok(Generation::new(self.text.clone(), 1, 1))
    }
}

/// Always fails with the given kind.
#[derive(Debug)]
pub struct FailingModel {
    kind: LlmErrorKind,
    calls: AtomicU32,
}

impl FailingModel {
    pub fn new(kind: LlmErrorKind) -> Self {
        Self {
            kind,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for FailingModel {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::new(self.kind, format!("scripted {} failure", self.kind)))
    }
}

/// Scout that takes longer than any test budget.
#[derive(Debug)]
pub struct SlowScout(pub Duration);

#[async_trait]
impl Scout for SlowScout {
    fn name(&self) -> &'static str {
        "slow_scout"
    }

    async fn analyze(&self, state: &GameState) -> AgentResult<BoardAnalysis> {
        tokio::time::sleep(self.0).await;
        AgentResult::ok(rule_based_analysis(state), self.0)
    }
}

/// Scout that reports a scripted analysis, whatever the board.
#[derive(Debug)]
pub struct FixedAnalysisScout(pub BoardAnalysis);

#[async_trait]
impl Scout for FixedAnalysisScout {
    fn name(&self) -> &'static str {
        "fixed_analysis_scout"
    }

    async fn analyze(&self, _state: &GameState) -> AgentResult<BoardAnalysis> {
        AgentResult::ok(self.0.clone(), Duration::ZERO)
    }
}

/// Executor that takes longer than any test budget.
#[derive(Debug)]
pub struct SlowExecutor(pub Duration);

#[async_trait]
impl MoveExecutor for SlowExecutor {
    fn name(&self) -> &'static str {
        "slow_executor"
    }

    async fn execute(&self, state: &GameState, strategy: &Strategy) -> AgentResult<MoveExecution> {
        tokio::time::sleep(self.0).await;
        Executor::default().execute(state, strategy).await
    }
}

/// Strategist that always reports failure.
#[derive(Debug)]
pub struct FailingStrategist;

#[async_trait]
impl Strategist for FailingStrategist {
    fn name(&self) -> &'static str {
        "failing_strategist"
    }

    async fn plan(&self, _state: &GameState, _analysis: &BoardAnalysis) -> AgentResult<Strategy> {
        AgentResult::failed("planner unavailable", None, Duration::ZERO)
    }
}

/// Strategist that recommends a fixed cell, legal or not, for its first
/// `bad_calls` calls, then plans normally.
#[derive(Debug)]
pub struct FixedCellStrategist {
    pub position: Position,
    pub bad_calls: u32,
    pub calls: AtomicU32,
}

impl FixedCellStrategist {
    pub fn new(position: Position, bad_calls: u32) -> Self {
        Self {
            position,
            bad_calls,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Strategist for FixedCellStrategist {
    fn name(&self) -> &'static str {
        "fixed_cell_strategist"
    }

    async fn plan(&self, state: &GameState, analysis: &BoardAnalysis) -> AgentResult<Strategy> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.bad_calls {
            return match rule_based_strategy(state, analysis) {
                Some(strategy) => AgentResult::ok(strategy, Duration::ZERO),
                None => AgentResult::failed("no moves", None, Duration::ZERO),
            };
        }
        let strategy = Strategy {
            primary: MoveRecommendation {
                position: self.position,
                priority: MovePriority::CenterControl,
                confidence: 0.75,
                rationale: "scripted".to_string(),
                expected_outcome: String::new(),
            },
            alternatives: Vec::new(),
            plan: "scripted".to_string(),
            risk: RiskLevel::Medium,
        };
        AgentResult::ok(strategy, Duration::ZERO)
    }
}
