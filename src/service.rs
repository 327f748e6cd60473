//! Service facade tying store, coordinator and statistics together.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::ArenaConfig;
use crate::engine::{EngineError, MoveCoordinator, Operation, Transition};
use crate::games::tictactoe::Game;
use crate::ids::{GameId, UserId};
use crate::stats::{LeaderboardEntry, Metric, StatsAggregator, UserStats};
use crate::store::{GameStore, MemoryStore, SqliteStore, User};

/// Entry point for the HTTP layer and the simulation driver.
#[derive(Debug, Clone)]
pub struct Arena {
    store: Arc<dyn GameStore>,
    coordinator: MoveCoordinator,
    stats: Arc<StatsAggregator>,
    config: ArenaConfig,
}

impl Arena {
    /// Builds an arena over `store`. Statistics start empty; call
    /// [`Arena::rebuild_stats`] to fold in games already in the store.
    #[instrument(skip_all)]
    pub fn new(store: Arc<dyn GameStore>, config: ArenaConfig) -> Self {
        let stats = Arc::new(StatsAggregator::new());
        let coordinator =
            MoveCoordinator::new(Arc::clone(&store), Arc::clone(&stats), config.clone());
        Self {
            store,
            coordinator,
            stats,
            config,
        }
    }

    /// Arena backed by a fresh in-memory store.
    pub fn in_memory(config: ArenaConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Opens the configured store and rebuilds statistics from it.
    ///
    /// Uses SQLite when `database_url` is set, memory otherwise.
    #[instrument(skip(config), fields(database_url = ?config.database_url()))]
    pub async fn open(config: ArenaConfig) -> Result<Self, EngineError> {
        let store: Arc<dyn GameStore> = match config.database_url() {
            Some(url) => Arc::new(SqliteStore::open(url)?),
            None => {
                info!("No database configured, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };
        let arena = Self::new(store, config);
        arena.rebuild_stats().await?;
        Ok(arena)
    }

    /// Active configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Move coordinator, for callers that submit raw operations.
    pub fn coordinator(&self) -> &MoveCoordinator {
        &self.coordinator
    }

    /// Live statistics projection.
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    async fn require_user(&self, user: UserId) -> Result<(), EngineError> {
        if self.store.user_exists(user).await? {
            Ok(())
        } else {
            warn!(user_id = %user, "Unknown user");
            Err(EngineError::UserNotFound(user))
        }
    }

    /// Registers a user.
    #[instrument(skip(self))]
    pub async fn create_user(&self, name: &str) -> Result<User, EngineError> {
        Ok(self.store.create_user(name.to_string()).await?)
    }

    /// Opens a new game with `creator` holding X.
    #[instrument(skip(self))]
    pub async fn create_game(&self, creator: UserId) -> Result<Game, EngineError> {
        self.require_user(creator).await?;
        let (_, game) = self.coordinator.create(creator).await?.into_parts();
        Ok(game)
    }

    /// Seats `user` as O.
    #[instrument(skip(self))]
    pub async fn join_game(&self, id: GameId, user: UserId) -> Result<Game, EngineError> {
        self.require_user(user).await?;
        let transition = self.coordinator.submit(id, Operation::Join { user }).await?;
        Ok(transition.into_parts().0)
    }

    /// Places `user`'s mark at (`row`, `col`).
    #[instrument(skip(self))]
    pub async fn submit_move(
        &self,
        id: GameId,
        user: UserId,
        row: usize,
        col: usize,
    ) -> Result<Transition, EngineError> {
        self.coordinator
            .submit(id, Operation::Move { user, row, col })
            .await
    }

    /// Current state of a game.
    #[instrument(skip(self))]
    pub async fn game(&self, id: GameId) -> Result<Game, EngineError> {
        Ok(self.coordinator.load(id).await?.into_parts().1)
    }

    /// Statistics for a registered user.
    #[instrument(skip(self))]
    pub async fn stats_for(&self, user: UserId) -> Result<UserStats, EngineError> {
        self.require_user(user).await?;
        Ok(self.stats.stats_for(user))
    }

    /// Top `k` users by `metric`.
    pub fn top_k(&self, metric: Metric, k: usize) -> Vec<LeaderboardEntry> {
        self.stats.top_k(metric, k)
    }

    /// Recomputes statistics from every completed game in the store.
    #[instrument(skip(self))]
    pub async fn rebuild_stats(&self) -> Result<usize, EngineError> {
        let games = self.store.completed_games().await?;
        let fresh = StatsAggregator::rebuild(games.iter());
        let folded = fresh.folded_games();
        self.stats.replace_with(fresh);
        info!(folded, "Statistics replaced from store");
        Ok(folded)
    }
}
