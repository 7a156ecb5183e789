//! Boundary shape of a serialized game state.

use strictly_tictactoe::{GameState, Player, Position, RulesEngine};

#[test]
fn test_game_state_json_shape() {
    let state = RulesEngine::default()
        .replay(Player::O, &[Position::CENTER, Position::new(0, 0)])
        .unwrap();
    let json = serde_json::to_value(&state).unwrap();

    for field in [
        "board",
        "current_turn",
        "move_count",
        "player_symbol",
        "ai_symbol",
        "is_terminal",
        "winner",
        "move_history",
        "created_at",
        "updated_at",
        "metadata",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(json["board"][1][1], "X");
    assert_eq!(json["board"][0][0], "O");
    assert_eq!(json["board"][2][2], "EMPTY");
    assert_eq!(json["current_turn"], "X");
    assert_eq!(json["winner"], serde_json::Value::Null);
    assert_eq!(json["move_history"][0]["position"]["row"], 1);
    assert_eq!(json["move_history"][1]["player"], "O");
}

#[test]
fn test_game_state_round_trip_preserves_history_order() {
    let moves = [Position::new(2, 2), Position::new(0, 1), Position::new(1, 0)];
    let state = RulesEngine::default().replay(Player::X, &moves).unwrap();
    let text = serde_json::to_string(&state).unwrap();
    let back: GameState = serde_json::from_str(&text).unwrap();
    assert_eq!(back, state);
    let order: Vec<Position> = back.move_history().iter().map(|m| m.position).collect();
    assert_eq!(order, moves);
}
