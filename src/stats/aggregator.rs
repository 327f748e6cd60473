//! Incremental statistics projection over completion events.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, instrument};

use super::models::{LeaderboardEntry, Metric, UserCounters, UserStats};
use crate::games::tictactoe::{CompletionEvent, Game};
use crate::ids::{GameId, UserId};

#[derive(Debug, Default, Clone, PartialEq)]
struct Ledger {
    folded: HashSet<GameId>,
    users: HashMap<UserId, UserCounters>,
}

impl Ledger {
    fn fold(&mut self, event: &CompletionEvent) -> bool {
        if !self.folded.insert(*event.game_id()) {
            return false;
        }
        match *event.winner() {
            Some(winner) => {
                self.users
                    .entry(winner)
                    .or_default()
                    .record_win(*event.winner_moves());
                if let Some(loser) = event.loser() {
                    self.users.entry(loser).or_default().record_loss();
                }
            }
            None => {
                for player in event.players() {
                    self.users.entry(*player).or_default().record_draw();
                }
            }
        }
        true
    }
}

/// Per-user counters folded from completion events.
///
/// Folding is idempotent per game id. Each event is applied under a single
/// write guard, so readers see either none or all of its effect.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    ledger: RwLock<Ledger>,
}

impl StatsAggregator {
    /// Creates an empty aggregator.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an aggregator from scratch out of game records.
    ///
    /// Games that are not completed are skipped.
    #[instrument(skip(games))]
    pub fn rebuild<'a>(games: impl IntoIterator<Item = &'a Game>) -> Self {
        let mut ledger = Ledger::default();
        for event in games.into_iter().filter_map(Game::completion_event) {
            ledger.fold(&event);
        }
        info!(
            games = ledger.folded.len(),
            users = ledger.users.len(),
            "Statistics rebuilt"
        );
        Self {
            ledger: RwLock::new(ledger),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Folds a completion event in. Returns `false` when this game was
    /// already counted.
    #[instrument(skip(self, event), fields(game_id = %event.game_id()))]
    pub fn on_completion(&self, event: &CompletionEvent) -> bool {
        let applied = self.write().fold(event);
        if applied {
            debug!(winner = ?event.winner(), "Completion folded");
        } else {
            debug!("Completion already folded, ignoring");
        }
        applied
    }

    /// Replaces the current ledger with `other`'s in one step.
    pub fn replace_with(&self, other: StatsAggregator) {
        let fresh = other
            .ledger
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        *self.write() = fresh;
    }

    /// Raw counters for `user`, `None` if they have no completed games.
    pub fn counters(&self, user: UserId) -> Option<UserCounters> {
        self.read().users.get(&user).copied()
    }

    /// Statistics for `user`; all zeros when they have no completed games.
    #[instrument(skip(self))]
    pub fn stats_for(&self, user: UserId) -> UserStats {
        let counters = self.counters(user).unwrap_or_default();
        UserStats::from_counters(user, &counters)
    }

    /// Top `k` users by `metric`, highest first, ties broken by ascending
    /// user id. Users for whom the metric is undefined are left out.
    #[instrument(skip(self))]
    pub fn top_k(&self, metric: Metric, k: usize) -> Vec<LeaderboardEntry> {
        let ledger = self.read();
        let mut rows: Vec<LeaderboardEntry> = ledger
            .users
            .iter()
            .filter_map(|(user, counters)| {
                counters
                    .metric(metric)
                    .map(|value| LeaderboardEntry::new(*user, value, counters))
            })
            .collect();
        drop(ledger);

        rows.sort_by(|a, b| {
            b.value()
                .total_cmp(a.value())
                .then_with(|| a.user_id().cmp(b.user_id()))
        });
        rows.truncate(k);
        rows
    }

    /// Copy of every user's counters, ordered by user id.
    pub fn snapshot(&self) -> BTreeMap<UserId, UserCounters> {
        self.read()
            .users
            .iter()
            .map(|(user, counters)| (*user, *counters))
            .collect()
    }

    /// Number of games folded in so far.
    pub fn folded_games(&self) -> usize {
        self.read().folded.len()
    }
}
