//! Draw detection logic.

use super::super::{Board, Cell};
use super::win::check_winner;
use tracing::instrument;

/// Checks if the board is full (no empty cell left).
#[instrument(skip(board), fields(size = board.size()))]
pub fn is_full(board: &Board) -> bool {
    board.cells().iter().all(|c| *c != Cell::Empty)
}

/// A full board with no winner is a draw.
pub fn is_draw(board: &Board) -> bool {
    is_full(board) && check_winner(board).is_none()
}
