//! Engine error types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::games::tictactoe::{PlaceError, RuleError};
use crate::ids::{GameId, UserId};
use crate::store::{StoreError, StoreErrorKind};

/// Closed set of failure categories exposed to callers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Game or user does not exist.
    NotFound,
    /// Operation not legal in the game's lifecycle state.
    InvalidState,
    /// Creator tried to join their own game.
    SelfJoin,
    /// User is not a participant.
    NotParticipant,
    /// User does not hold the turn.
    NotYourTurn,
    /// Cell outside the board.
    OutOfBounds,
    /// Cell already taken.
    CellOccupied,
    /// Exclusivity could not be obtained in time.
    Contention,
    /// Storage backend failure.
    Storage,
}

/// Error returned by the move coordinator and the service facade.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum EngineError {
    /// No game with this id.
    #[display("game {} not found", _0)]
    GameNotFound(GameId),

    /// No user with this id.
    #[display("user {} not found", _0)]
    UserNotFound(UserId),

    /// The state machine rejected the operation.
    #[display("{}", _0)]
    Rule(RuleError),

    /// Lock wait timed out or every write attempt lost a version race.
    #[display("game {} is busy after {} attempt(s)", game, attempts)]
    Contention {
        /// Contended game.
        game: GameId,
        /// Write attempts made before giving up (0 for a lock timeout).
        attempts: u32,
    },

    /// Storage backend failed.
    #[display("{}", _0)]
    Store(StoreError),
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rule(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RuleError> for EngineError {
    fn from(err: RuleError) -> Self {
        Self::Rule(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err.kind {
            StoreErrorKind::GameNotFound(game) => Self::GameNotFound(game),
            _ => Self::Store(err),
        }
    }
}

impl EngineError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GameNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Rule(rule) => match rule {
                RuleError::InvalidState(_) => ErrorKind::InvalidState,
                RuleError::SelfJoin(_) => ErrorKind::SelfJoin,
                RuleError::NotParticipant(_) => ErrorKind::NotParticipant,
                RuleError::NotYourTurn(_) => ErrorKind::NotYourTurn,
                RuleError::Place(PlaceError::OutOfBounds { .. }) => ErrorKind::OutOfBounds,
                RuleError::Place(PlaceError::CellOccupied { .. }) => ErrorKind::CellOccupied,
            },
            Self::Contention { .. } => ErrorKind::Contention,
            Self::Store(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::GameStatus;

    #[test]
    fn test_kinds_cover_rule_errors() {
        let cases = [
            (RuleError::InvalidState(GameStatus::Completed), ErrorKind::InvalidState),
            (RuleError::SelfJoin(UserId::new(1)), ErrorKind::SelfJoin),
            (RuleError::NotParticipant(UserId::new(3)), ErrorKind::NotParticipant),
            (RuleError::NotYourTurn(UserId::new(2)), ErrorKind::NotYourTurn),
            (
                RuleError::Place(PlaceError::OutOfBounds { row: 3, col: 0, size: 3 }),
                ErrorKind::OutOfBounds,
            ),
            (
                RuleError::Place(PlaceError::CellOccupied { row: 0, col: 0 }),
                ErrorKind::CellOccupied,
            ),
        ];
        for (rule, kind) in cases {
            assert_eq!(EngineError::from(rule).kind(), kind);
        }
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err = EngineError::from(StoreError::new(StoreErrorKind::GameNotFound(GameId::new(4))));
        assert_eq!(err, EngineError::GameNotFound(GameId::new(4)));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let backend = EngineError::from(StoreError::backend("disk full"));
        assert_eq!(backend.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let err = EngineError::UserNotFound(UserId::new(9));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "user 9 not found");
    }

    #[test]
    fn test_kind_names_are_snake_case() {
        assert_eq!(ErrorKind::NotYourTurn.as_ref(), "not_your_turn");
        assert_eq!(ErrorKind::CellOccupied.to_string(), "cell_occupied");
    }
}
