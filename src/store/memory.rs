//! Process-local store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::games::tictactoe::{Game, GameStatus};
use crate::ids::{GameId, UserId};
use crate::store::{GameStore, StoreError, StoreErrorKind, StoredGame, User};

#[derive(Debug, Default)]
struct Tables {
    next_user: i64,
    next_game: i64,
    users: HashMap<UserId, User>,
    games: BTreeMap<GameId, StoredGame>,
}

/// In-memory store for tests, simulations and database-less runs.
///
/// Tables sit behind one mutex that is held only for the duration of a single
/// read or write, never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory store");
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored games.
    pub fn game_count(&self) -> usize {
        self.tables().games.len()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    #[instrument(skip(self))]
    async fn create_user(&self, name: String) -> Result<User, StoreError> {
        let mut tables = self.tables();
        tables.next_user += 1;
        let user = User::new(UserId::new(tables.next_user), name, Utc::now());
        tables.users.insert(*user.id(), user.clone());
        info!(user_id = %user.id(), "User created");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn user_exists(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.tables().users.contains_key(&id))
    }

    #[instrument(skip(self))]
    async fn create_game(
        &self,
        creator: UserId,
        board_size: usize,
    ) -> Result<StoredGame, StoreError> {
        let mut tables = self.tables();
        tables.next_game += 1;
        let id = GameId::new(tables.next_game);
        let stored = StoredGame::new(0, Game::create(id, creator, board_size));
        tables.games.insert(id, stored.clone());
        info!(game_id = %id, "Game stored");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn load_game(&self, id: GameId) -> Result<Option<StoredGame>, StoreError> {
        let stored = self.tables().games.get(&id).cloned();
        if stored.is_none() {
            debug!("Game not found");
        }
        Ok(stored)
    }

    #[instrument(skip(self, game), fields(game_id = %game.id(), status = %game.status()))]
    async fn save_game(&self, game: &Game, expected_version: u64) -> Result<u64, StoreError> {
        let mut tables = self.tables();
        let slot = tables
            .games
            .get_mut(&game.id())
            .ok_or_else(|| StoreError::new(StoreErrorKind::GameNotFound(game.id())))?;

        if *slot.version() != expected_version {
            warn!(
                expected_version,
                actual = *slot.version(),
                "Version conflict"
            );
            return Err(StoreError::new(StoreErrorKind::VersionConflict {
                game: game.id(),
                expected: expected_version,
            }));
        }

        let next = expected_version + 1;
        *slot = StoredGame::new(next, game.clone());
        debug!(version = next, "Game saved");
        Ok(next)
    }

    #[instrument(skip(self))]
    async fn completed_games(&self) -> Result<Vec<Game>, StoreError> {
        let games: Vec<Game> = self
            .tables()
            .games
            .values()
            .filter(|stored| stored.game().status() == GameStatus::Completed)
            .map(|stored| stored.game().clone())
            .collect();
        info!(count = games.len(), "Completed games listed");
        Ok(games)
    }
}
