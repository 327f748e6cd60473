//! Persistence layer for users and game records.
//!
//! [`GameStore`] is the boundary the engine writes through. Every game record
//! carries a version that increases by one on each successful write; writers
//! pass the version they loaded and the store refuses the write when it no
//! longer matches.

mod error;
mod memory;
mod models;
mod schema; // Diesel generated schema - internal use only
mod sqlite;

pub use error::{StoreError, StoreErrorKind};
pub use memory::MemoryStore;
pub use models::{StoredGame, User};
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::games::tictactoe::Game;
use crate::ids::{GameId, UserId};

/// Durable storage for users and games keyed by id.
#[async_trait]
pub trait GameStore: Send + Sync + std::fmt::Debug {
    /// Creates a user and assigns a fresh id.
    async fn create_user(&self, name: String) -> Result<User, StoreError>;

    /// True when a user with this id exists.
    async fn user_exists(&self, id: UserId) -> Result<bool, StoreError>;

    /// Allocates a game id and stores a new open game at version 0.
    async fn create_game(&self, creator: UserId, board_size: usize)
    -> Result<StoredGame, StoreError>;

    /// Reads the current record, `None` when the id is unknown.
    async fn load_game(&self, id: GameId) -> Result<Option<StoredGame>, StoreError>;

    /// Writes `game` if its stored version still equals `expected_version`.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// [`StoreErrorKind::VersionConflict`] when another writer got there first,
    /// [`StoreErrorKind::GameNotFound`] when the record does not exist.
    async fn save_game(&self, game: &Game, expected_version: u64) -> Result<u64, StoreError>;

    /// Every completed game, ordered by id.
    async fn completed_games(&self) -> Result<Vec<Game>, StoreError>;
}
