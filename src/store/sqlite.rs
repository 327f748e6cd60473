//! SQLite-backed store built on Diesel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::games::tictactoe::{Game, GameStatus};
use crate::ids::{GameId, UserId};
use crate::store::models::{GameRow, NewGameRow, NewMoveRow, NewUserRow, UserRow};
use crate::store::{GameStore, StoreError, StoreErrorKind, StoredGame, User, schema};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Store backed by a SQLite database file.
///
/// Each operation opens its own connection on the blocking pool. Writes run
/// inside `BEGIN IMMEDIATE` transactions and update a game only when its
/// `version` column still matches, so several processes may share one file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: Arc<str>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `db_path` and applies
    /// pending migrations.
    ///
    /// The path must name a file; `:memory:` would give every connection its
    /// own empty database. Use [`MemoryStore`](super::MemoryStore) instead.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path.as_ref()))]
    pub fn open(db_path: impl AsRef<str>) -> Result<Self, StoreError> {
        info!("Opening SQLite store");
        let store = Self {
            db_path: Arc::from(db_path.as_ref()),
        };

        let mut conn = establish(&store.db_path)?;
        conn.batch_execute("PRAGMA journal_mode = WAL;")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::backend(format!("Migration failed: {}", e)))?;
        info!(applied = applied.len(), "Migrations applied");

        Ok(store)
    }

    /// Returns the database path.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Runs `op` on a fresh connection in the blocking pool.
    async fn run<T, F>(&self, label: &'static str, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = Arc::clone(&self.db_path);
        tokio::task::spawn_blocking(move || {
            let mut conn = establish(&db_path)?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StoreError::backend(format!("{} task failed: {}", label, e)))?
    }
}

/// Establishes a connection with a busy timeout so concurrent writers queue
/// instead of failing with `SQLITE_BUSY`.
fn establish(db_path: &str) -> Result<SqliteConnection, StoreError> {
    debug!(path = %db_path, "Establishing connection");
    let mut conn = SqliteConnection::establish(db_path)
        .map_err(|e| StoreError::backend(format!("Failed to connect to '{}': {}", db_path, e)))?;
    conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

#[async_trait]
impl GameStore for SqliteStore {
    #[instrument(skip(self))]
    async fn create_user(&self, name: String) -> Result<User, StoreError> {
        self.run("create_user", move |conn| {
            let row = diesel::insert_into(schema::users::table)
                .values(&NewUserRow::new(name, Utc::now().naive_utc()))
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            info!(user_id = row.id, name = %row.name, "User created");
            Ok(User::from(row))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn user_exists(&self, id: UserId) -> Result<bool, StoreError> {
        self.run("user_exists", move |conn| {
            let found = diesel::select(diesel::dsl::exists(
                schema::users::table.find(id.get()),
            ))
            .get_result::<bool>(conn)?;
            Ok(found)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn create_game(
        &self,
        creator: UserId,
        board_size: usize,
    ) -> Result<StoredGame, StoreError> {
        self.run("create_game", move |conn| {
            conn.immediate_transaction::<_, StoreError, _>(|conn| {
                let placeholder = NewGameRow {
                    creator_id: creator.get(),
                    status: GameStatus::Open.as_ref().to_string(),
                    version: 0,
                    snapshot: String::new(),
                    updated_at: Utc::now().naive_utc(),
                };
                let id: i64 = diesel::insert_into(schema::games::table)
                    .values(&placeholder)
                    .returning(schema::games::id)
                    .get_result(conn)?;

                let game = Game::create(GameId::new(id), creator, board_size);
                let snapshot = serde_json::to_string(&game)?;
                diesel::update(schema::games::table.find(id))
                    .set(schema::games::snapshot.eq(snapshot))
                    .execute(conn)?;

                info!(game_id = id, "Game row created");
                Ok(StoredGame::new(0, game))
            })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn load_game(&self, id: GameId) -> Result<Option<StoredGame>, StoreError> {
        self.run("load_game", move |conn| {
            let row = schema::games::table
                .find(id.get())
                .select(GameRow::as_select())
                .first(conn)
                .optional()?;
            row.map(|r| r.decode()).transpose()
        })
        .await
    }

    #[instrument(skip(self, game), fields(game_id = %game.id(), status = %game.status()))]
    async fn save_game(&self, game: &Game, expected_version: u64) -> Result<u64, StoreError> {
        use schema::{games, moves};

        let game = game.clone();
        self.run("save_game", move |conn| {
            let id = game.id().get();
            let next = expected_version + 1;
            let snapshot = serde_json::to_string(&game)?;
            let now = Utc::now().naive_utc();

            conn.immediate_transaction::<_, StoreError, _>(|conn| {
                let updated = diesel::update(
                    games::table
                        .filter(games::id.eq(id))
                        .filter(games::version.eq(expected_version as i64)),
                )
                .set((
                    games::opponent_id.eq(game.opponent().map(UserId::get)),
                    games::status.eq(game.status().as_ref()),
                    games::winner_id.eq(game.winner().map(UserId::get)),
                    games::version.eq(next as i64),
                    games::snapshot.eq(snapshot.as_str()),
                    games::updated_at.eq(now),
                ))
                .execute(conn)?;

                if updated == 0 {
                    let exists = diesel::select(diesel::dsl::exists(games::table.find(id)))
                        .get_result::<bool>(conn)?;
                    let kind = if exists {
                        warn!(expected_version, "Version conflict");
                        StoreErrorKind::VersionConflict {
                            game: game.id(),
                            expected: expected_version,
                        }
                    } else {
                        StoreErrorKind::GameNotFound(game.id())
                    };
                    return Err(StoreError::new(kind));
                }

                let recorded: i64 = moves::table
                    .filter(moves::game_id.eq(id))
                    .count()
                    .get_result(conn)?;
                let fresh: Vec<NewMoveRow> = game
                    .history()
                    .iter()
                    .skip(recorded as usize)
                    .map(|mv| NewMoveRow::from_move(game.id(), mv, now))
                    .collect();
                if !fresh.is_empty() {
                    diesel::insert_into(moves::table)
                        .values(&fresh)
                        .execute(conn)?;
                }

                debug!(version = next, new_moves = fresh.len(), "Game saved");
                Ok(next)
            })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn completed_games(&self) -> Result<Vec<Game>, StoreError> {
        self.run("completed_games", |conn| {
            let rows = schema::games::table
                .filter(schema::games::status.eq(GameStatus::Completed.as_ref()))
                .order(schema::games::id.asc())
                .select(GameRow::as_select())
                .load::<GameRow>(conn)?;
            info!(count = rows.len(), "Completed games loaded");
            rows.iter()
                .map(|r| r.decode().map(|stored| stored.into_parts().1))
                .collect()
        })
        .await
    }
}
