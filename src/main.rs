//! Grid Arena - Unified CLI
//!
//! HTTP server and self-play simulation over the same engine.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use grid_arena::simulation::{self, SimulationConfig};
use grid_arena::{Arena, ArenaConfig, server};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,grid_arena=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ArenaConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config = config.with_database_url(url);
    }

    match cli.command {
        Command::Serve { port, host } => run_server(config, host, port).await,
        Command::Simulate {
            games,
            players,
            workers,
            seed,
        } => {
            let mut settings = SimulationConfig::default()
                .with_games(games)
                .with_players(usize::from(players))
                .with_workers(usize::from(workers));
            if let Some(seed) = seed {
                settings = settings.with_seed(seed);
            }
            run_simulation(config, settings).await
        }
    }
}

/// Run the HTTP API server
#[instrument(skip(config))]
async fn run_server(config: ArenaConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = config;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }

    info!(host = %config.host(), port = *config.port(), "Starting Grid Arena server");
    let arena = Arc::new(Arena::open(config.clone()).await?);
    server::serve(arena, config.host(), *config.port()).await
}

/// Run the self-play simulation
#[instrument(skip(config))]
async fn run_simulation(config: ArenaConfig, settings: SimulationConfig) -> Result<()> {
    info!(?settings, "Starting simulation");
    let arena = Arc::new(Arena::open(config).await?);
    let report = simulation::run(arena, &settings).await?;
    print!("{}", simulation::render(&report));
    Ok(())
}
