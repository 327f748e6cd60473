//! Store models: public domain records and the Diesel row types behind them.

use chrono::{DateTime, NaiveDateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::games::tictactoe::{Game, Move};
use crate::ids::{GameId, UserId};
use crate::store::{StoreError, schema};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct User {
    id: UserId,
    name: String,
    created_at: DateTime<Utc>,
}

/// A game record together with its write version.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct StoredGame {
    version: u64,
    game: Game,
}

impl StoredGame {
    /// Splits into version and game.
    pub fn into_parts(self) -> (u64, Game) {
        (self.version, self.game)
    }
}

/// User row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::users)]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::new(UserId::new(row.id), row.name, row.created_at.and_utc())
    }
}

/// Insertable user row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub(crate) struct NewUserRow {
    name: String,
    created_at: NaiveDateTime,
}

/// Game row. The full game is kept as a JSON snapshot; the other columns are
/// denormalised for queries and for the version check.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::games)]
pub(crate) struct GameRow {
    pub id: i64,
    pub version: i64,
    pub snapshot: String,
}

impl GameRow {
    /// Decodes the snapshot into a [`StoredGame`].
    #[instrument(skip(self), fields(game_id = self.id, version = self.version))]
    pub fn decode(&self) -> Result<StoredGame, StoreError> {
        let game: Game = serde_json::from_str(&self.snapshot)?;
        Ok(StoredGame::new(self.version as u64, game))
    }
}

/// Insertable game row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::games)]
pub(crate) struct NewGameRow {
    pub creator_id: i64,
    pub status: String,
    pub version: i64,
    pub snapshot: String,
    pub updated_at: NaiveDateTime,
}

/// Insertable move row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::moves)]
pub(crate) struct NewMoveRow {
    pub game_id: i64,
    pub user_id: i64,
    pub move_no: i32,
    pub row_idx: i32,
    pub col_idx: i32,
    pub performed_at: NaiveDateTime,
}

impl NewMoveRow {
    pub fn from_move(game: GameId, mv: &Move, performed_at: NaiveDateTime) -> Self {
        Self {
            game_id: game.get(),
            user_id: mv.player().get(),
            move_no: *mv.number() as i32,
            row_idx: *mv.row() as i32,
            col_idx: *mv.col() as i32,
            performed_at,
        }
    }
}
