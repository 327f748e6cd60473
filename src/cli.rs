//! Command-line interface for grid_arena.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Grid Arena - concurrency-safe tic-tac-toe engine
#[derive(Parser, Debug)]
#[command(name = "grid_arena")]
#[command(about = "Tic-tac-toe arena with REST API, leaderboards and self-play", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config and DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Play random games between generated users and print the leaderboard
    Simulate {
        /// Number of games to play
        #[arg(long, default_value = "50")]
        games: usize,

        /// Number of users to create
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u16).range(2..))]
        players: u16,

        /// Games in flight at once
        #[arg(long, default_value = "8", value_parser = clap::value_parser!(u16).range(1..))]
        workers: u16,

        /// Fix RNG seed for reproducible pairings and moves
        #[arg(long)]
        seed: Option<u64>,
    },
}
