//! Game state machine: `open → in_progress → completed`.
//!
//! A [`Game`] owns its [`Board`] together with the participants, the turn
//! indicator and the outcome. Every transition validates first and mutates
//! second, so a rejected join or move leaves the game exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::action::{CompletionEvent, Move};
use super::error::RuleError;
use super::types::{Board, Evaluation, GameStatus, Mark};
use crate::ids::{GameId, UserId};

/// How a completed game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// This user completed a line.
    Winner(UserId),
    /// Board filled with no line.
    Draw,
}

/// One match between a creator and an opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    creator: UserId,
    opponent: Option<UserId>,
    board: Board,
    status: GameStatus,
    outcome: Option<Outcome>,
    to_move: Mark,
    history: Vec<Move>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Creates an open game with an empty `board_size`×`board_size` board.
    #[instrument]
    pub fn create(id: GameId, creator: UserId, board_size: usize) -> Self {
        debug!("Creating open game");
        Self {
            id,
            creator,
            opponent: None,
            board: Board::new(board_size),
            status: GameStatus::Open,
            outcome: None,
            to_move: Mark::X,
            history: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Seats `user` as the opponent and starts the game. The creator moves first.
    ///
    /// # Errors
    ///
    /// [`RuleError::InvalidState`] unless the game is open,
    /// [`RuleError::SelfJoin`] when `user` created the game.
    #[instrument(skip(self), fields(game_id = %self.id, status = %self.status))]
    pub fn join(&mut self, user: UserId) -> Result<(), RuleError> {
        if self.status != GameStatus::Open {
            warn!("Join rejected: game is not open");
            return Err(RuleError::InvalidState(self.status));
        }
        if user == self.creator {
            warn!("Join rejected: creator cannot join own game");
            return Err(RuleError::SelfJoin(user));
        }

        self.opponent = Some(user);
        self.status = GameStatus::InProgress;
        self.to_move = Mark::X;
        self.started_at = Some(Utc::now());

        info!(creator = %self.creator, opponent = %user, "Game started");
        Ok(())
    }

    /// Applies a move by `user` at (row, col).
    ///
    /// Returns a [`CompletionEvent`] when this move ended the game.
    ///
    /// # Errors
    ///
    /// Checked in order: [`RuleError::InvalidState`] unless in progress,
    /// [`RuleError::NotParticipant`], [`RuleError::NotYourTurn`], then the
    /// board's out-of-bounds and occupied-cell errors.
    #[instrument(skip(self), fields(game_id = %self.id, status = %self.status))]
    pub fn play(
        &mut self,
        user: UserId,
        row: usize,
        col: usize,
    ) -> Result<Option<CompletionEvent>, RuleError> {
        if self.status != GameStatus::InProgress {
            warn!("Move rejected: game is not in progress");
            return Err(RuleError::InvalidState(self.status));
        }
        let mark = self.mark_of(user).ok_or_else(|| {
            warn!("Move rejected: user is not a participant");
            RuleError::NotParticipant(user)
        })?;
        if mark != self.to_move {
            warn!(expected = %self.to_move, actual = %mark, "Move rejected: out of turn");
            return Err(RuleError::NotYourTurn(user));
        }

        self.board.place(row, col, mark)?;
        let number = self.move_count() + 1;
        self.history.push(Move::new(number, user, mark, row, col));
        debug_assert!(
            (0..=1).contains(
                &(self.board.count(Mark::X) as isize - self.board.count(Mark::O) as isize)
            ),
            "marks must alternate"
        );

        match self.board.evaluate() {
            Evaluation::Ongoing => {
                self.to_move = mark.opponent();
                debug!(number, next = %self.to_move, "Move applied");
                Ok(None)
            }
            Evaluation::Won(winner) => {
                let winner = self.user_of(winner).unwrap_or(user);
                self.finish(Outcome::Winner(winner));
                Ok(self.completion_event())
            }
            Evaluation::Draw => {
                self.finish(Outcome::Draw);
                Ok(self.completion_event())
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.status = GameStatus::Completed;
        self.outcome = Some(outcome);
        self.completed_at = Some(Utc::now());
        info!(
            game_id = %self.id,
            outcome = ?outcome,
            moves = self.move_count(),
            "Game completed"
        );
    }

    /// Builds the completion event for a completed game, `None` otherwise.
    ///
    /// Deterministic in the game record, so replaying completed games yields
    /// the same events the live transitions produced.
    pub fn completion_event(&self) -> Option<CompletionEvent> {
        let outcome = self.outcome?;
        let opponent = self.opponent?;
        let winner = match outcome {
            Outcome::Winner(user) => Some(user),
            Outcome::Draw => None,
        };
        let winner_moves = winner.map_or(0, |w| {
            self.history.iter().filter(|m| *m.player() == w).count() as u32
        });
        Some(CompletionEvent::new(
            self.id,
            [self.creator, opponent],
            winner,
            self.move_count(),
            winner_moves,
        ))
    }

    /// Returns the mark held by `user`, if they participate.
    pub fn mark_of(&self, user: UserId) -> Option<Mark> {
        if user == self.creator {
            Some(Mark::X)
        } else if self.opponent == Some(user) {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// Returns the user holding `mark`, if seated.
    pub fn user_of(&self, mark: Mark) -> Option<UserId> {
        match mark {
            Mark::X => Some(self.creator),
            Mark::O => self.opponent,
        }
    }

    /// User expected to move next; `None` unless the game is in progress.
    pub fn turn_holder(&self) -> Option<UserId> {
        (self.status == GameStatus::InProgress)
            .then(|| self.user_of(self.to_move))
            .flatten()
    }

    /// Returns the game id.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Returns the creator.
    pub fn creator(&self) -> UserId {
        self.creator
    }

    /// Returns the opponent, once joined.
    pub fn opponent(&self) -> Option<UserId> {
        self.opponent
    }

    /// Participants in seat order (creator first).
    pub fn players(&self) -> Vec<UserId> {
        std::iter::once(self.creator).chain(self.opponent).collect()
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Returns the outcome; set if and only if the game is completed.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Returns the winner; `None` while running or after a draw.
    pub fn winner(&self) -> Option<UserId> {
        match self.outcome {
            Some(Outcome::Winner(user)) => Some(user),
            _ => None,
        }
    }

    /// Mark to move next.
    pub fn to_move(&self) -> Mark {
        self.to_move
    }

    /// Accepted moves in order.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Number of accepted moves.
    pub fn move_count(&self) -> u32 {
        self.history.len() as u32
    }

    /// When the game was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the opponent joined.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the game reached its terminal state.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}
