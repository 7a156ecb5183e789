//! Strictly Pipeline - CLI
//!
//! Interactive play and one-shot automated turns.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::path::{Path, PathBuf};
use strictly_pipeline::{AgentMode, GameSession, Pipeline, PipelineConfig, PipelineError, PipelineState};
use strictly_tictactoe::{GameState, Outcome, Player, Position};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_pipeline=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            symbol,
            mode,
        } => run_play(config, symbol, mode).await,
        Command::Turn {
            state,
            config,
            mode,
        } => run_turn(state, config, mode).await,
    }
}

fn load_config(path: Option<PathBuf>, mode: Option<AgentMode>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => PipelineConfig::default(),
    };
    Ok(match mode {
        Some(mode) => config.with_agent_mode(mode),
        None => config,
    })
}

/// Play an interactive game against the pipeline
#[instrument(skip(config_path))]
async fn run_play(config_path: Option<PathBuf>, symbol: Player, mode: Option<AgentMode>) -> Result<()> {
    let config = load_config(config_path, mode)?;
    info!(mode = %config.agent_mode(), %symbol, "Starting interactive game");
    let pipeline = Pipeline::connect(config)?;
    let mut session = GameSession::new("cli".to_string(), symbol, pipeline);
    session.start()?;

    println!("You are {}. Enter moves as \"row col\" (0-2) or a name like \"top left\"; \"q\" quits.", symbol);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match session.phase() {
            PipelineState::Completed => {
                println!("{}", session.state().board().display());
                match session.state().winner() {
                    Some(Outcome::Winner(p)) if p == symbol => println!("You win!"),
                    Some(Outcome::Winner(_)) => println!("The AI wins."),
                    _ => println!("It's a draw."),
                }
                return Ok(());
            }
            PipelineState::AiTurn | PipelineState::Error => match session.take_ai_turn().await {
                Ok(turn) => {
                    println!(
                        "AI plays {} ({}): {}",
                        turn.execution.position, turn.execution.priority_used, turn.execution.rationale
                    );
                    if let Some(reason) = &turn.fallback_reason {
                        println!("  (fallback used: {})", reason);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "AI turn failed");
                    println!("The AI could not move: {}", err);
                    return Err(err.into());
                }
            },
            _ => {
                println!("{}", session.state().board().display());
                println!("Your move ({}):", symbol);
                let Some(line) = lines.next_line().await? else {
                    return Ok(());
                };
                let input = line.trim();
                if input.eq_ignore_ascii_case("q") {
                    return Ok(());
                }
                let Some(position) = Position::parse(input) else {
                    println!("Could not read {:?} as a cell.", input);
                    continue;
                };
                match session.submit_player_move(position) {
                    Ok(_) => {}
                    Err(PipelineError::IllegalMove(err)) => println!("Illegal move: {}", err),
                    Err(err) => return Err(err.into()),
                }
            }
        }
    }
}

/// Run one automated turn on a saved state
#[instrument]
async fn run_turn(state_path: PathBuf, config_path: Option<PathBuf>, mode: Option<AgentMode>) -> Result<()> {
    let state = read_state(&state_path)?;
    let config = load_config(config_path, mode)?;
    let pipeline = Pipeline::connect(config)?;
    let turn = pipeline.take_ai_turn(&state).await?;
    println!("{}", serde_json::to_string_pretty(&turn)?);
    Ok(())
}

fn read_state(path: &Path) -> Result<GameState> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read game state from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse game state in {}", path.display()))
}
