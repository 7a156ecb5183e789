//! Command-line interface for strictly_pipeline.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strictly_pipeline::AgentMode;
use strictly_tictactoe::Player;

/// Strictly Pipeline - tic-tac-toe against a staged decision pipeline
#[derive(Parser, Debug)]
#[command(name = "strictly_pipeline")]
#[command(about = "Play tic-tac-toe against a rule-based or model-assisted opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play an interactive game in the terminal
    Play {
        /// Path to pipeline config (defaults are used if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Symbol you play; X moves first
        #[arg(short, long, default_value = "X", value_parser = parse_player)]
        symbol: Player,

        /// Override the configured agent mode
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<AgentMode>,
    },

    /// Run one automated turn on a saved game state and print the result as JSON
    Turn {
        /// Path to a GameState JSON file
        #[arg(short, long)]
        state: PathBuf,

        /// Path to pipeline config (defaults are used if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured agent mode
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<AgentMode>,
    },
}

fn parse_player(s: &str) -> Result<Player, String> {
    Player::parse(s).map_err(|e| e.to_string())
}

fn parse_mode(s: &str) -> Result<AgentMode, String> {
    s.parse::<AgentMode>()
        .map_err(|_| format!("unknown mode {:?} (expected rule_based or model_assisted)", s))
}
