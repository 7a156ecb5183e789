//! Exhaustive checks over every board reachable through legal play.

use std::collections::HashSet;
use strictly_tictactoe::{
    Board, DrawDetection, GameState, MovePriority, Outcome, Player, Position, PriorityEngine,
    RulesEngine, Square, rules::winning_players, winning_cells,
};

/// Depth-first walk over all reachable states, visiting each board once.
fn reachable_states(engine: RulesEngine) -> Vec<GameState> {
    let mut seen: HashSet<Board> = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![engine.new_game(Player::X)];
    while let Some(state) = stack.pop() {
        if !seen.insert(state.board().clone()) {
            continue;
        }
        for pos in engine.legal_moves(&state) {
            let next = engine
                .apply_move(&state, pos, state.current_turn())
                .expect("legal move must apply");
            stack.push(next);
        }
        out.push(state);
    }
    out
}

/// Brute-force line check written independently of the rules module.
fn brute_force_winner(board: &Board) -> Option<Player> {
    let cell = |r: u8, c: u8| board.get(Position::new(r, c)).and_then(Square::player);
    let mut lines: Vec<[(u8, u8); 3]> = Vec::new();
    for i in 0..3 {
        lines.push([(i, 0), (i, 1), (i, 2)]);
        lines.push([(0, i), (1, i), (2, i)]);
    }
    lines.push([(0, 0), (1, 1), (2, 2)]);
    lines.push([(0, 2), (1, 1), (2, 0)]);
    lines.into_iter().find_map(|[a, b, c]| {
        let first = cell(a.0, a.1)?;
        (cell(b.0, b.1) == Some(first) && cell(c.0, c.1) == Some(first)).then_some(first)
    })
}

#[test]
fn test_reachable_board_count() {
    // 5478 distinct positions are reachable in tic-tac-toe
    assert_eq!(reachable_states(RulesEngine::default()).len(), 5478);
}

#[test]
fn test_winner_agrees_with_brute_force() {
    let engine = RulesEngine::default();
    for state in reachable_states(engine) {
        assert_eq!(engine.winner(state.board()), brute_force_winner(state.board()));
    }
}

#[test]
fn test_no_two_winners_and_no_live_full_board() {
    let engine = RulesEngine::default();
    for state in reachable_states(engine) {
        assert!(winning_players(state.board()).len() <= 1);
        if state.board().is_full() {
            assert!(state.is_terminal());
        }
        if state.is_terminal() {
            assert!(state.winner().is_some());
        }
        assert!(engine.check_invariants(&state).is_ok());
    }
}

#[test]
fn test_engine_always_takes_available_win() {
    let engine = RulesEngine::default();
    let priority = PriorityEngine::new();
    for state in reachable_states(engine).iter().filter(|s| !s.is_terminal()) {
        let mover = state.current_turn();
        if !winning_cells(state.board(), mover).is_empty() {
            let choice = priority.select(state.board(), mover).unwrap();
            assert_eq!(choice.priority, MovePriority::ImmediateWin);
            assert_eq!(choice.confidence, 1.0);
            let after = engine.apply_move(state, choice.position, mover).unwrap();
            assert_eq!(after.winner(), Some(Outcome::Winner(mover)));
        }
    }
}

#[test]
fn test_engine_blocks_when_no_win() {
    let engine = RulesEngine::default();
    let priority = PriorityEngine::new();
    for state in reachable_states(engine).iter().filter(|s| !s.is_terminal()) {
        let mover = state.current_turn();
        let threats = winning_cells(state.board(), mover.opponent());
        if winning_cells(state.board(), mover).is_empty() && !threats.is_empty() {
            let choice = priority.select(state.board(), mover).unwrap();
            assert_eq!(choice.priority, MovePriority::BlockThreat);
            assert!(threats.iter().any(|(pos, _)| *pos == choice.position));
        }
    }
}

#[test]
fn test_every_scored_move_carries_its_level_confidence() {
    let engine = RulesEngine::default();
    let priority = PriorityEngine::new();
    let mut prevent_fork_seen = 0;
    for state in reachable_states(engine).iter().filter(|s| !s.is_terminal()) {
        for scored in priority.evaluate(state.board(), state.current_turn()) {
            assert_eq!(
                scored.confidence,
                scored.priority.confidence(),
                "{} at {} on\n{}",
                scored.priority,
                scored.position,
                state.board().display()
            );
            if scored.priority == MovePriority::PreventFork {
                prevent_fork_seen += 1;
            }
        }
    }
    assert!(prevent_fork_seen > 0);
}

#[test]
fn test_engine_is_total_and_deterministic() {
    let engine = RulesEngine::default();
    let priority = PriorityEngine::new();
    for state in reachable_states(engine).iter().filter(|s| !s.is_terminal()) {
        let mover = state.current_turn();
        let first = priority.select(state.board(), mover).expect("live game has a move");
        let second = priority.select(state.board(), mover).unwrap();
        assert_eq!(first.position, second.position);
        assert!(engine.legal_moves(state).contains(&first.position));
    }
}

#[test]
fn test_engine_never_loses_self_play() {
    // Engine vs engine from every opening reply must end in a draw
    let engine = RulesEngine::default();
    let priority = PriorityEngine::new();
    for opening in Position::ALL {
        let mut state = engine.replay(Player::X, &[opening]).unwrap();
        while !state.is_terminal() {
            let mover = state.current_turn();
            let choice = priority.select(state.board(), mover).unwrap();
            state = engine.apply_move(&state, choice.position, mover).unwrap();
        }
        assert_eq!(state.winner(), Some(Outcome::Draw), "opening {opening}");
    }
}

#[test]
fn test_inevitable_draw_mode_same_outcomes() {
    // Early termination changes timing, never the result of engine play
    let complete = RulesEngine::new(DrawDetection::Complete);
    let eager = RulesEngine::new(DrawDetection::Inevitable);
    let priority = PriorityEngine::new();
    for opening in Position::ALL {
        let play = |engine: RulesEngine| {
            let mut state = engine.replay(Player::X, &[opening]).unwrap();
            while !state.is_terminal() {
                let mover = state.current_turn();
                let choice = priority.select(state.board(), mover).unwrap();
                state = engine.apply_move(&state, choice.position, mover).unwrap();
            }
            state
        };
        let a = play(complete);
        let b = play(eager);
        assert_eq!(a.winner(), b.winner());
        assert!(b.move_count() <= a.move_count());
    }
}

/// Counts games the engine loses when the other side tries every reply.
fn losses(engine: RulesEngine, state: &GameState, ai: Player) -> usize {
    if state.is_terminal() {
        return usize::from(state.winner() == Some(Outcome::Winner(ai.opponent())));
    }
    let mover = state.current_turn();
    if mover == ai {
        let choice = PriorityEngine::new().select(state.board(), mover).unwrap();
        let next = engine.apply_move(state, choice.position, mover).unwrap();
        return losses(engine, &next, ai);
    }
    engine
        .legal_moves(state)
        .into_iter()
        .map(|pos| losses(engine, &engine.apply_move(state, pos, mover).unwrap(), ai))
        .sum()
}

#[test]
fn test_engine_never_loses_against_any_opponent() {
    let engine = RulesEngine::default();
    for ai in [Player::X, Player::O] {
        let start = engine.new_game(ai.opponent());
        assert_eq!(losses(engine, &start, ai), 0, "engine playing {ai}");
    }
}
