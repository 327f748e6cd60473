//! Statistics value types.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ids::UserId;

/// Raw per-user counters. Every derived metric is computed from these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct UserCounters {
    games_played: u32,
    wins: u32,
    draws: u32,
    losses: u32,
    winning_moves: u32,
}

impl UserCounters {
    pub(super) fn record_win(&mut self, moves: u32) {
        self.games_played += 1;
        self.wins += 1;
        self.winning_moves += moves;
    }

    pub(super) fn record_loss(&mut self) {
        self.games_played += 1;
        self.losses += 1;
    }

    pub(super) fn record_draw(&mut self) {
        self.games_played += 1;
        self.draws += 1;
    }

    /// Wins divided by games played; 0.0 when no games were played.
    #[instrument(skip(self))]
    pub fn win_ratio(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.wins as f64 / self.games_played as f64
        }
    }

    /// Mean number of own moves needed per win; `None` without wins.
    pub fn avg_moves_to_win(&self) -> Option<f64> {
        (self.wins > 0 && self.winning_moves > 0)
            .then(|| self.winning_moves as f64 / self.wins as f64)
    }

    /// Reciprocal of [`avg_moves_to_win`](Self::avg_moves_to_win): higher
    /// means faster wins. `None` without wins.
    pub fn efficiency(&self) -> Option<f64> {
        self.avg_moves_to_win().map(|avg| 1.0 / avg)
    }

    /// Value of `metric` for these counters, `None` when undefined.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Wins => Some(self.wins as f64),
            Metric::WinRatio => Some(self.win_ratio()),
            Metric::GamesPlayed => Some(self.games_played as f64),
            Metric::Efficiency => self.efficiency(),
        }
    }
}

/// Statistics for one user as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct UserStats {
    user_id: UserId,
    games: u32,
    wins: u32,
    losses: u32,
    draws: u32,
    win_ratio: f64,
    efficiency: Option<f64>,
    avg_moves_to_win: Option<f64>,
}

impl UserStats {
    /// Derives the public view from raw counters.
    pub fn from_counters(user_id: UserId, counters: &UserCounters) -> Self {
        Self {
            user_id,
            games: counters.games_played,
            wins: counters.wins,
            losses: counters.losses,
            draws: counters.draws,
            win_ratio: counters.win_ratio(),
            efficiency: counters.efficiency(),
            avg_moves_to_win: counters.avg_moves_to_win(),
        }
    }
}

/// Rankable metric.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    /// Total wins.
    Wins,
    /// Wins over games played.
    WinRatio,
    /// Reciprocal of mean own moves per win.
    Efficiency,
    /// Completed games the user took part in.
    GamesPlayed,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct LeaderboardEntry {
    user_id: UserId,
    value: f64,
    wins: u32,
    games: u32,
}

impl LeaderboardEntry {
    pub(super) fn new(user_id: UserId, value: f64, counters: &UserCounters) -> Self {
        Self {
            user_id,
            value,
            wins: counters.wins,
            games: counters.games_played,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_games_has_zero_ratio() {
        let counters = UserCounters::default();
        assert_eq!(counters.win_ratio(), 0.0);
        assert_eq!(counters.efficiency(), None);
        assert_eq!(counters.metric(Metric::Efficiency), None);
        assert_eq!(counters.metric(Metric::Wins), Some(0.0));
    }

    #[test]
    fn test_efficiency_is_reciprocal_of_average() {
        let mut counters = UserCounters::default();
        counters.record_win(3);
        counters.record_win(5);
        counters.record_loss();
        assert_eq!(counters.avg_moves_to_win(), Some(4.0));
        assert_eq!(counters.efficiency(), Some(0.25));
        assert!((counters.win_ratio() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("win_ratio".parse::<Metric>().ok(), Some(Metric::WinRatio));
        assert_eq!("efficiency".parse::<Metric>().ok(), Some(Metric::Efficiency));
        assert!("speed".parse::<Metric>().is_err());
        assert_eq!(Metric::GamesPlayed.to_string(), "games_played");
    }
}
