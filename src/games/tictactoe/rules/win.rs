//! Win detection logic.

use super::super::{Board, Cell, Mark};
use tracing::instrument;

/// Returns every winning line as a list of (row, col) coordinates.
///
/// Order is rows top-to-bottom, columns left-to-right, the main diagonal,
/// then the anti-diagonal.
pub fn lines(size: usize) -> Vec<Vec<(usize, usize)>> {
    let mut lines = Vec::with_capacity(2 * size + 2);
    for row in 0..size {
        lines.push((0..size).map(|col| (row, col)).collect());
    }
    for col in 0..size {
        lines.push((0..size).map(|row| (row, col)).collect());
    }
    lines.push((0..size).map(|i| (i, i)).collect());
    lines.push((0..size).map(|i| (i, size - 1 - i)).collect());
    lines
}

/// Checks if there is a winner on the board.
///
/// Returns the mark of the first complete line found, `None` otherwise.
#[instrument(skip(board), fields(size = board.size()))]
pub fn check_winner(board: &Board) -> Option<Mark> {
    if board.size() == 0 {
        return None;
    }

    lines(board.size()).into_iter().find_map(|line| {
        let (r0, c0) = line[0];
        let first = board.get(r0, c0)?;
        let Cell::Occupied(mark) = first else {
            return None;
        };
        line.iter()
            .all(|&(r, c)| board.get(r, c) == Some(first))
            .then_some(mark)
    })
}
