//! Concurrent self-play driver.
//!
//! Every game runs two tasks, one per seat, that poll the game and fire a
//! move whenever they think it is their turn. Both hit the coordinator
//! concurrently, so losing submissions are part of the normal flow.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use derive_getters::Getters;
use derive_setters::Setters;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::engine::{EngineError, ErrorKind};
use crate::games::tictactoe::{GameStatus, Outcome};
use crate::ids::{GameId, UserId};
use crate::service::Arena;
use crate::stats::{LeaderboardEntry, Metric};

/// Pause between polls while waiting for the opponent.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Leaderboard rows included in the report.
const REPORT_TOP: usize = 3;

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct SimulationConfig {
    /// Games to play.
    games: usize,
    /// Users to create; at least two.
    players: usize,
    /// Games allowed in flight at once.
    workers: usize,
    /// Seed for reproducible pairings and moves.
    #[setters(strip_option)]
    seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            games: 50,
            players: 10,
            workers: 8,
            seed: None,
        }
    }
}

/// What a simulation run produced.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct SimulationReport {
    /// Users created for the run.
    users: Vec<UserId>,
    /// Games played to completion.
    completed: usize,
    /// Games that ended with a winner.
    decisive: usize,
    /// Games that ended in a draw.
    draws: usize,
    /// Submissions the coordinator turned away.
    rejected_moves: u64,
    /// Top users by win ratio.
    leaderboard: Vec<LeaderboardEntry>,
}

/// Why a simulation stopped early.
#[derive(Debug, derive_more::Display)]
pub enum SimulationError {
    /// Fewer than two players or no workers.
    #[display("invalid simulation settings: {}", _0)]
    Settings(String),
    /// The arena failed in a way the players cannot recover from.
    #[display("{}", _0)]
    Engine(EngineError),
    /// A player task panicked or was cancelled.
    #[display("simulation task failed: {}", _0)]
    Task(String),
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for SimulationError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<tokio::task::JoinError> for SimulationError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Plays `config.games` games between random pairs of fresh users.
///
/// # Errors
///
/// [`SimulationError::Settings`] for fewer than two players or zero workers;
/// otherwise the first unrecoverable engine or task failure.
#[instrument(skip(arena))]
pub async fn run(
    arena: Arc<Arena>,
    config: &SimulationConfig,
) -> Result<SimulationReport, SimulationError> {
    if config.players < 2 {
        return Err(SimulationError::Settings(format!(
            "need at least 2 players, got {}",
            config.players
        )));
    }
    if config.workers == 0 {
        return Err(SimulationError::Settings(
            "need at least 1 worker".to_string(),
        ));
    }

    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };

    let mut users = Vec::with_capacity(config.players);
    for n in 1..=config.players {
        let user = arena.create_user(&format!("player-{}", n)).await?;
        users.push(*user.id());
    }
    info!(players = users.len(), games = config.games, "Simulation starting");

    let rejected = Arc::new(AtomicU64::new(0));
    let permits = Arc::new(Semaphore::new(config.workers));
    let mut matches = JoinSet::new();

    for _ in 0..config.games {
        let first = rng.random_range(0..users.len());
        let mut second = rng.random_range(0..users.len() - 1);
        if second >= first {
            second += 1;
        }
        let (creator, opponent) = (users[first], users[second]);
        let seeds = [rng.random::<u64>(), rng.random::<u64>()];

        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|e| SimulationError::Task(e.to_string()))?;
        let arena = Arc::clone(&arena);
        let rejected = Arc::clone(&rejected);
        matches.spawn(async move {
            let _permit = permit;
            play_match(arena, creator, opponent, seeds, rejected).await
        });
    }

    let (mut completed, mut decisive, mut draws) = (0, 0, 0);
    while let Some(joined) = matches.join_next().await {
        match joined?? {
            Outcome::Winner(_) => decisive += 1,
            Outcome::Draw => draws += 1,
        }
        completed += 1;
    }

    let report = SimulationReport {
        users,
        completed,
        decisive,
        draws,
        rejected_moves: rejected.load(Ordering::Relaxed),
        leaderboard: arena.top_k(Metric::WinRatio, REPORT_TOP),
    };
    info!(
        completed,
        decisive,
        draws,
        rejected = report.rejected_moves,
        "Simulation finished"
    );
    Ok(report)
}

#[instrument(skip(arena, seeds, rejected))]
async fn play_match(
    arena: Arc<Arena>,
    creator: UserId,
    opponent: UserId,
    seeds: [u64; 2],
    rejected: Arc<AtomicU64>,
) -> Result<Outcome, SimulationError> {
    let id = arena.create_game(creator).await?.id();
    arena.join_game(id, opponent).await?;
    debug!(game_id = %id, "Match seated");

    let mut seats = JoinSet::new();
    for (user, seed) in [creator, opponent].into_iter().zip(seeds) {
        seats.spawn(play_seat(
            Arc::clone(&arena),
            id,
            user,
            SmallRng::seed_from_u64(seed),
            Arc::clone(&rejected),
        ));
    }
    while let Some(joined) = seats.join_next().await {
        joined??;
    }

    arena
        .game(id)
        .await?
        .outcome()
        .ok_or_else(|| SimulationError::Task(format!("game {} ended without an outcome", id)))
}

async fn play_seat(
    arena: Arc<Arena>,
    id: GameId,
    me: UserId,
    mut rng: SmallRng,
    rejected: Arc<AtomicU64>,
) -> Result<(), SimulationError> {
    loop {
        let game = arena.game(id).await?;
        if game.status() == GameStatus::Completed {
            return Ok(());
        }
        if game.turn_holder() != Some(me) {
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        }

        let empty = game.board().empty_cells();
        if empty.is_empty() {
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        }
        let (row, col) = empty[rng.random_range(0..empty.len())];

        match arena.submit_move(id, me, row, col).await {
            Ok(_) => {}
            Err(err) => match err.kind() {
                ErrorKind::NotYourTurn
                | ErrorKind::CellOccupied
                | ErrorKind::InvalidState
                | ErrorKind::Contention => {
                    rejected.fetch_add(1, Ordering::Relaxed);
                    debug!(user_id = %me, error = %err, "Submission lost the race");
                }
                _ => {
                    warn!(user_id = %me, error = %err, "Player stopping on error");
                    return Err(err.into());
                }
            },
        }
    }
}

/// Renders the report the way the CLI prints it.
pub fn render(report: &SimulationReport) -> String {
    let mut out = format!(
        "Played {} games ({} decisive, {} draws), {} submissions rejected\nTop {} by win ratio:\n",
        report.completed,
        report.decisive,
        report.draws,
        report.rejected_moves,
        REPORT_TOP
    );
    for (rank, entry) in report.leaderboard.iter().enumerate() {
        out.push_str(&format!(
            "  {}. user {} win_ratio={:.3} wins={} games={}\n",
            rank + 1,
            entry.user_id(),
            entry.value(),
            entry.wins(),
            entry.games()
        ));
    }
    out
}
