//! Session state machine tests across fatal and recovered turns.

mod common;

use common::{FixedCellStrategist, fast_config};
use strictly_pipeline::{GameSession, Pipeline, PipelineError, PipelineState, RuleBasedScout, Stage};
use strictly_tictactoe::{MoveError, Outcome, Player, Position};

#[tokio::test]
async fn test_fatal_turn_leaves_error_then_resumes() {
    // First plan is off the board, later plans are the engine's own
    let pipeline = Pipeline::new(
        fast_config(),
        Box::new(RuleBasedScout),
        Box::new(FixedCellStrategist::new(Position::new(3, 3), 1)),
    );
    let mut session = GameSession::new("recover".to_string(), Player::O, pipeline);
    assert_eq!(session.start().unwrap(), PipelineState::AiTurn);

    let err = session.take_ai_turn().await.unwrap_err();
    assert_eq!(
        err,
        PipelineError::FallbackRejected {
            stage: Stage::Execution,
            error: MoveError::OutOfBounds { row: 3, col: 3 },
        }
    );
    assert_eq!(session.phase(), PipelineState::Error);
    assert_eq!(session.state().move_count(), 0);
    assert!(session.last_turn().is_none());

    let turn = session.take_ai_turn().await.unwrap();
    assert_eq!(turn.execution.position, Position::CENTER);
    assert_eq!(session.phase(), PipelineState::PlayerTurn);
    assert_eq!(session.state().move_count(), 1);
}

#[tokio::test]
async fn test_player_cannot_move_during_ai_turn() {
    let mut session = GameSession::new(
        "order".to_string(),
        Player::O,
        Pipeline::rule_based(fast_config()),
    );
    session.start().unwrap();
    let err = session.submit_player_move(Position::CENTER).unwrap_err();
    assert_eq!(
        err,
        PipelineError::IllegalMove(MoveError::WrongTurn {
            expected: Player::X,
            actual: Player::O,
        })
    );
    assert_eq!(session.state().move_count(), 0);
}

#[tokio::test]
async fn test_ai_turn_refused_on_player_turn() {
    let mut session = GameSession::new(
        "order".to_string(),
        Player::X,
        Pipeline::rule_based(fast_config()),
    );
    session.start().unwrap();
    let err = session.take_ai_turn().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            from: PipelineState::PlayerTurn,
            ..
        }
    ));
}

#[tokio::test]
async fn test_ai_wins_against_careless_player() {
    let mut session = GameSession::new(
        "careless".to_string(),
        Player::O,
        Pipeline::rule_based(fast_config()),
    );
    session.start().unwrap();

    // AI takes the center; the human keeps playing the top edge row
    let careless = [Position::new(0, 1), Position::new(2, 1), Position::new(1, 0)];
    let mut replies = careless.iter();
    while session.phase() != PipelineState::Completed {
        match session.phase() {
            PipelineState::AiTurn => {
                session.take_ai_turn().await.unwrap();
            }
            PipelineState::PlayerTurn => {
                let next = replies
                    .by_ref()
                    .find(|p| session.state().board().is_empty(**p))
                    .copied()
                    .or_else(|| session.state().board().empty_positions().first().copied())
                    .unwrap();
                session.submit_player_move(next).unwrap();
            }
            other => panic!("unexpected phase {other}"),
        }
    }
    assert_eq!(session.state().winner(), Some(Outcome::Winner(Player::X)));
}
