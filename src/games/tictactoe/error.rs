//! Rule violations raised by the board and the game state machine.

use super::types::GameStatus;
use crate::ids::UserId;

/// Error returned when a mark cannot be placed on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PlaceError {
    /// Row or column lies outside the grid.
    #[display("cell ({}, {}) is outside the {}x{} board", row, col, size, size)]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Board side length.
        size: usize,
    },

    /// Target cell already holds a mark.
    #[display("cell ({}, {}) is already occupied", row, col)]
    CellOccupied {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },
}

impl std::error::Error for PlaceError {}

/// Error returned when a join or move is not legal for the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RuleError {
    /// Operation is not legal in the game's current lifecycle state.
    #[display("operation not allowed while game is {}", _0)]
    InvalidState(GameStatus),

    /// Creator tried to join their own game.
    #[display("user {} cannot join their own game", _0)]
    SelfJoin(UserId),

    /// User is not one of the game's two participants.
    #[display("user {} is not playing in this game", _0)]
    NotParticipant(UserId),

    /// User does not hold the turn.
    #[display("it is not user {}'s turn", _0)]
    NotYourTurn(UserId),

    /// Board rejected the placement.
    Place(PlaceError),
}

impl std::error::Error for RuleError {}

impl From<PlaceError> for RuleError {
    fn from(err: PlaceError) -> Self {
        Self::Place(err)
    }
}
