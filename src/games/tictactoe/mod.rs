mod action;
mod error;
mod game;
pub mod rules;
mod types;

pub use action::{CompletionEvent, Move};
pub use error::{PlaceError, RuleError};
pub use game::{Game, Outcome};
pub use types::{Board, Cell, DEFAULT_BOARD_SIZE, Evaluation, GameStatus, Mark};
