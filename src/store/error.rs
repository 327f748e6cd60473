//! Store error types.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::ids::GameId;

/// What went wrong inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreErrorKind {
    /// No game with this id.
    #[display("game {} not found", _0)]
    GameNotFound(GameId),

    /// Stored version differs from the one the writer read.
    #[display("game {} changed underneath the writer (expected version {})", game, expected)]
    VersionConflict {
        /// Game being written.
        game: GameId,
        /// Version the writer loaded.
        expected: u64,
    },

    /// Backend failure (connection, query, serialization).
    #[display("{}", _0)]
    Backend(String),
}

/// Store error with location tracking.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Store error: {} at {}:{}", kind, file, line)]
pub struct StoreError {
    /// What went wrong.
    pub kind: StoreErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a store error with caller location tracking.
    #[track_caller]
    #[instrument]
    pub fn new(kind: StoreErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Creates a backend error from a message.
    #[track_caller]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Backend(message.into()))
    }

    /// True when the write lost a compare-and-swap race.
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, StoreErrorKind::VersionConflict { .. })
    }
}

impl From<diesel::result::Error> for StoreError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::backend(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::backend(format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::backend(format!("Snapshot encoding error: {}", err))
    }
}
