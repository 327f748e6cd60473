//! Serializes joins and moves per game.

use std::sync::Arc;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::error::EngineError;
use super::locks::GameLocks;
use crate::config::ArenaConfig;
use crate::games::tictactoe::{CompletionEvent, Game, RuleError};
use crate::ids::{GameId, UserId};
use crate::stats::StatsAggregator;
use crate::store::{GameStore, StoredGame};

/// A state-changing request against one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Take the second seat.
    Join {
        /// Joining user.
        user: UserId,
    },
    /// Place the caller's mark.
    Move {
        /// Moving user.
        user: UserId,
        /// Target row.
        row: usize,
        /// Target column.
        col: usize,
    },
}

impl Operation {
    /// User issuing the operation.
    pub fn user(&self) -> UserId {
        match *self {
            Self::Join { user } | Self::Move { user, .. } => user,
        }
    }

    fn apply(&self, game: &mut Game) -> Result<Option<CompletionEvent>, RuleError> {
        match *self {
            Self::Join { user } => game.join(user).map(|()| None),
            Self::Move { user, row, col } => game.play(user, row, col),
        }
    }
}

/// Result of an accepted operation.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Transition {
    /// Game after the operation.
    game: Game,
    /// Stored version after the write.
    version: u64,
    /// Set when this operation completed the game.
    completion: Option<CompletionEvent>,
}

impl Transition {
    /// Splits into the game and its completion event.
    pub fn into_parts(self) -> (Game, Option<CompletionEvent>) {
        (self.game, self.completion)
    }
}

/// The only writer of game records.
///
/// Each `submit` holds the game's lease for one load-apply-save cycle. The
/// save is conditional on the version read, so a writer in another process
/// sharing the same store cannot be overwritten silently; a lost race is
/// retried from a fresh load up to `max_write_attempts` times.
#[derive(Debug, Clone)]
pub struct MoveCoordinator {
    store: Arc<dyn GameStore>,
    locks: GameLocks,
    stats: Arc<StatsAggregator>,
    config: ArenaConfig,
}

impl MoveCoordinator {
    /// Creates a coordinator writing through `store` and folding completions
    /// into `stats`.
    #[instrument(skip_all)]
    pub fn new(store: Arc<dyn GameStore>, stats: Arc<StatsAggregator>, config: ArenaConfig) -> Self {
        info!(
            lock_timeout_ms = *config.lock_timeout_ms(),
            max_write_attempts = *config.max_write_attempts(),
            "Creating move coordinator"
        );
        Self {
            store,
            locks: GameLocks::new(),
            stats,
            config,
        }
    }

    /// Lock table, for inspection.
    pub fn locks(&self) -> &GameLocks {
        &self.locks
    }

    /// Stores a new open game for `creator`.
    #[instrument(skip(self))]
    pub async fn create(&self, creator: UserId) -> Result<StoredGame, EngineError> {
        let stored = self
            .store
            .create_game(creator, *self.config.board_size())
            .await?;
        info!(game_id = %stored.game().id(), "Game created");
        Ok(stored)
    }

    /// Current record of a game, read without taking the lease.
    #[instrument(skip(self))]
    pub async fn load(&self, id: GameId) -> Result<StoredGame, EngineError> {
        self.store
            .load_game(id)
            .await?
            .ok_or(EngineError::GameNotFound(id))
    }

    /// Applies `op` to game `id` under exclusive access.
    ///
    /// # Errors
    ///
    /// - [`EngineError::GameNotFound`] for an unknown id
    /// - [`EngineError::Rule`] when the state machine rejects the operation;
    ///   the stored game is unchanged
    /// - [`EngineError::Contention`] when the lease could not be taken in time
    ///   or every write attempt lost a version race
    /// - [`EngineError::Store`] on backend failure
    #[instrument(skip(self), fields(game_id = %id))]
    pub async fn submit(&self, id: GameId, op: Operation) -> Result<Transition, EngineError> {
        self.load(id).await?;

        let _lease = self
            .locks
            .acquire(id, self.config.lock_timeout())
            .await
            .map_err(|timeout| {
                warn!(error = %timeout, "Lease not obtained");
                EngineError::Contention {
                    game: id,
                    attempts: 0,
                }
            })?;

        let attempts = *self.config.max_write_attempts();
        for attempt in 1..=attempts {
            let (version, mut game) = self.load(id).await?.into_parts();
            let completion = op.apply(&mut game).inspect_err(|rule| {
                debug!(error = %rule, "Operation rejected");
            })?;

            match self.store.save_game(&game, version).await {
                Ok(version) => {
                    if let Some(event) = &completion {
                        self.stats.on_completion(event);
                        info!(winner = ?event.winner(), moves = *event.move_count(), "Game completed");
                    }
                    debug!(version, attempt, "Operation applied");
                    return Ok(Transition {
                        game,
                        version,
                        completion,
                    });
                }
                Err(err) if err.is_conflict() => {
                    warn!(attempt, attempts, "Lost version race, reloading");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(attempts, "Giving up after repeated version conflicts");
        Err(EngineError::Contention { game: id, attempts })
    }
}
