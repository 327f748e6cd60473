//! Core domain types for N×N tic-tac-toe.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

use super::error::PlaceError;
use super::rules;

/// Default board side length.
pub const DEFAULT_BOARD_SIZE: usize = 3;

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Mark {
    /// Mark X (creator, moves first).
    X,
    /// Mark O (opponent, moves second).
    O,
}

impl Mark {
    /// Returns the other mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// A single cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Empty cell.
    Empty,
    /// Cell holding a mark.
    Occupied(Mark),
}

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// No complete line and at least one empty cell.
    Ongoing,
    /// A complete line of this mark exists.
    Won(Mark),
    /// Board is full with no complete line.
    Draw,
}

/// Square grid of cells stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates an empty board with the given side length.
    #[instrument]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    /// Returns the side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the cell at (row, col), or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col).copied()
    }

    /// Places a mark on an empty in-bounds cell.
    ///
    /// # Errors
    ///
    /// [`PlaceError::OutOfBounds`] when the coordinates fall outside the grid,
    /// [`PlaceError::CellOccupied`] when the cell already holds a mark.
    #[instrument(skip(self), fields(size = self.size))]
    pub fn place(&mut self, row: usize, col: usize, mark: Mark) -> Result<(), PlaceError> {
        let size = self.size;
        match self.get(row, col) {
            None => Err(PlaceError::OutOfBounds { row, col, size }),
            Some(Cell::Occupied(_)) => Err(PlaceError::CellOccupied { row, col }),
            Some(Cell::Empty) => {
                self.cells[row * size + col] = Cell::Occupied(mark);
                Ok(())
            }
        }
    }

    /// Evaluates the board for a win, a draw, or an ongoing game.
    #[instrument(skip(self), fields(size = self.size))]
    pub fn evaluate(&self) -> Evaluation {
        if let Some(mark) = rules::check_winner(self) {
            Evaluation::Won(mark)
        } else if rules::is_full(self) {
            Evaluation::Draw
        } else {
            Evaluation::Ongoing
        }
    }

    /// Iterates over all cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells holding `mark`.
    pub fn count(&self, mark: Mark) -> usize {
        self.cells
            .iter()
            .filter(|c| **c == Cell::Occupied(mark))
            .count()
    }

    /// Returns coordinates of every empty cell.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Cell::Empty)
            .map(|(i, _)| (i / self.size, i % self.size))
            .collect()
    }

    /// Returns each row as a vector of cells.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.cells
            .chunks(self.size.max(1))
            .map(<[Cell]>::to_vec)
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divider = vec!["-"; self.size].join("+");
        for (r, row) in self.rows().iter().enumerate() {
            let line: Vec<&str> = row
                .iter()
                .map(|c| match c {
                    Cell::Empty => ".",
                    Cell::Occupied(Mark::X) => "X",
                    Cell::Occupied(Mark::O) => "O",
                })
                .collect();
            write!(f, "{}", line.join("|"))?;
            if r + 1 < self.size {
                write!(f, "\n{divider}\n")?;
            }
        }
        Ok(())
    }
}

/// Lifecycle state of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameStatus {
    /// Waiting for an opponent.
    Open,
    /// Both players present, moves being made.
    InProgress,
    /// Terminal: won or drawn.
    Completed,
}
