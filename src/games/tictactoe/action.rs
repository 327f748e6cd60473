//! First-class records produced by the state machine.
//!
//! Moves are domain events, not side effects: each accepted move is kept in
//! the game's history and the final transition produces one
//! [`CompletionEvent`] for the statistics projection.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use super::Mark;
use crate::ids::{GameId, UserId};

/// An accepted move: a player placing their mark at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct Move {
    /// 1-based sequence number within the game.
    number: u32,
    /// User who made the move.
    player: UserId,
    /// Mark placed.
    mark: Mark,
    /// Row of the cell.
    row: usize,
    /// Column of the cell.
    col: usize,
}

impl Move {
    pub(super) fn new(number: u32, player: UserId, mark: Mark, row: usize, col: usize) -> Self {
        Self {
            number,
            player,
            mark,
            row,
            col,
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} ({}) -> ({}, {})",
            self.number, self.player, self.mark, self.row, self.col
        )
    }
}

/// The fact that a game reached its terminal state.
///
/// Emitted exactly once per game, by the move that completed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct CompletionEvent {
    /// Completed game.
    game_id: GameId,
    /// Both participants, creator first.
    players: [UserId; 2],
    /// Winning user, `None` for a draw.
    winner: Option<UserId>,
    /// Total moves applied in the game.
    move_count: u32,
    /// Moves made by the winner alone (0 for a draw).
    winner_moves: u32,
}

impl CompletionEvent {
    pub(super) fn new(
        game_id: GameId,
        players: [UserId; 2],
        winner: Option<UserId>,
        move_count: u32,
        winner_moves: u32,
    ) -> Self {
        Self {
            game_id,
            players,
            winner,
            move_count,
            winner_moves,
        }
    }

    /// Returns the opponent of the winner, `None` for a draw.
    pub fn loser(&self) -> Option<UserId> {
        let winner = self.winner?;
        self.players.iter().copied().find(|p| *p != winner)
    }
}
