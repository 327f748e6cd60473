//! Grid Arena - concurrency-safe tic-tac-toe engine
//!
//! Users create two-player games, join them and submit moves from many tasks
//! at once. Every write to a game goes through one coordinator that takes a
//! per-game lease and saves only if the stored version is unchanged.
//! Completed games feed a statistics projection used for leaderboards.
//!
//! # Architecture
//!
//! - **Games**: board and state machine for one game (pure, no I/O)
//! - **Store**: versioned persistence (in-memory or SQLite via Diesel)
//! - **Engine**: per-game locks, compare-and-swap writes, error kinds
//! - **Stats**: per-user counters folded from completion events
//! - **Service**: the [`Arena`] facade used by the HTTP layer and simulation
//!
//! # Example
//!
//! ```no_run
//! use grid_arena::{Arena, ArenaConfig, Metric};
//!
//! # async fn example() -> Result<(), grid_arena::EngineError> {
//! let arena = Arena::in_memory(ArenaConfig::default());
//! let alice = *arena.create_user("alice").await?.id();
//! let bob = *arena.create_user("bob").await?.id();
//!
//! let game = arena.create_game(alice).await?;
//! arena.join_game(game.id(), bob).await?;
//! arena.submit_move(game.id(), alice, 1, 1).await?;
//!
//! let top = arena.top_k(Metric::WinRatio, 3);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod engine;
mod games;
mod ids;
mod service;
mod stats;
mod store;

// Public modules
pub mod server;
pub mod simulation;

// Crate-level exports - Configuration
pub use config::{ArenaConfig, ConfigError, DATABASE_URL_VAR, MAX_BOARD_SIZE, PORT_VAR};

// Crate-level exports - Identifiers
pub use ids::{GameId, UserId};

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{
    Board, Cell, CompletionEvent, DEFAULT_BOARD_SIZE, Evaluation, Game, GameStatus, Mark, Move,
    Outcome, PlaceError, RuleError, rules,
};

// Crate-level exports - Engine
pub use engine::{
    EngineError, ErrorKind, GameLease, GameLocks, LockTimeout, MoveCoordinator, Operation,
    Transition,
};

// Crate-level exports - Persistence
pub use store::{GameStore, MemoryStore, SqliteStore, StoreError, StoreErrorKind, StoredGame, User};

// Crate-level exports - Statistics
pub use stats::{LeaderboardEntry, Metric, StatsAggregator, UserCounters, UserStats};

// Crate-level exports - Service facade
pub use service::Arena;
