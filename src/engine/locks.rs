//! Per-game exclusivity.
//!
//! One async mutex per game id, created on first use. The table only holds
//! weak references, so a slot disappears once every lease and every waiter
//! for that id is gone. Distinct ids never share a slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, instrument, trace, warn};

use crate::ids::GameId;

/// Table size above which dead slots are swept on checkout.
const SWEEP_THRESHOLD: usize = 256;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of per-game async mutexes.
#[derive(Debug, Clone, Default)]
pub struct GameLocks {
    slots: Arc<Mutex<HashMap<GameId, Weak<AsyncMutex<()>>>>>,
}

/// The waiter gave up before the lock became free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("timed out after {:?} waiting for game {}", waited, game)]
pub struct LockTimeout {
    /// Game whose lock was requested.
    pub game: GameId,
    /// How long the caller waited.
    pub waited: Duration,
}

impl std::error::Error for LockTimeout {}

impl GameLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<GameId, Weak<AsyncMutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checkout(&self, game: GameId) -> Slot {
        let mut table = self.table();
        if let Some(slot) = table.get(&game).and_then(Weak::upgrade) {
            return slot;
        }
        if table.len() >= SWEEP_THRESHOLD {
            let before = table.len();
            table.retain(|_, weak| weak.strong_count() > 0);
            trace!(swept = before - table.len(), "Swept idle lock slots");
        }
        let slot: Slot = Arc::new(AsyncMutex::new(()));
        table.insert(game, Arc::downgrade(&slot));
        slot
    }

    fn prune(&self, game: GameId) {
        let mut table = self.table();
        if table
            .get(&game)
            .is_some_and(|weak| weak.strong_count() == 0)
        {
            table.remove(&game);
        }
    }

    /// Waits up to `wait` for exclusive access to `game`.
    ///
    /// Waiters are served in arrival order. A waiter that times out or is
    /// cancelled leaves the table as if it had never asked.
    ///
    /// # Errors
    ///
    /// [`LockTimeout`] when the lock did not become free in time.
    #[instrument(skip(self))]
    pub async fn acquire(&self, game: GameId, wait: Duration) -> Result<GameLease, LockTimeout> {
        // Dropping this before the lock is won (timeout or cancellation)
        // releases the slot reference and prunes the entry if it was the last.
        let mut pending = PendingSlot {
            locks: self,
            game,
            slot: None,
        };
        let slot = Arc::clone(pending.slot.insert(self.checkout(game)));

        let attempt = tokio::time::timeout(wait, slot.lock_owned()).await;
        match attempt {
            Ok(guard) => {
                pending.slot = None;
                trace!("Game lock acquired");
                Ok(GameLease {
                    guard: Some(guard),
                    locks: self.clone(),
                    game,
                })
            }
            Err(_) => {
                warn!(waited_ms = wait.as_millis() as u64, "Game lock wait timed out");
                Err(LockTimeout { game, waited: wait })
            }
        }
    }

    /// Number of live slots. Dead entries are not counted.
    pub fn active(&self) -> usize {
        self.table()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Raw table size including dead entries not yet pruned.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// True when the table holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

struct PendingSlot<'a> {
    locks: &'a GameLocks,
    game: GameId,
    slot: Option<Slot>,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if self.slot.take().is_some() {
            self.locks.prune(self.game);
        }
    }
}

/// Exclusive access to one game, released on drop.
#[derive(Debug)]
pub struct GameLease {
    guard: Option<OwnedMutexGuard<()>>,
    locks: GameLocks,
    game: GameId,
}

impl GameLease {
    /// Game this lease covers.
    pub fn game(&self) -> GameId {
        self.game
    }
}

impl Drop for GameLease {
    fn drop(&mut self) {
        // The guard owns an Arc to the slot; drop it first so pruning sees
        // the real reference count.
        drop(self.guard.take());
        self.locks.prune(self.game);
        debug!(game_id = %self.game, "Game lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_lease_released_and_pruned() {
        let locks = GameLocks::new();
        let lease = locks.acquire(GameId::new(1), WAIT).await.expect("free lock");
        assert_eq!(lease.game(), GameId::new(1));
        assert_eq!(locks.active(), 1);
        drop(lease);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_second_waiter_times_out_cleanly() {
        let locks = GameLocks::new();
        let held = locks.acquire(GameId::new(1), WAIT).await.expect("free lock");

        let err = locks
            .acquire(GameId::new(1), Duration::from_millis(20))
            .await
            .expect_err("held elsewhere");
        assert_eq!(err.game, GameId::new(1));
        assert_eq!(locks.active(), 1);

        drop(held);
        assert!(locks.is_empty());
        let again = locks.acquire(GameId::new(1), WAIT).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_games_do_not_block() {
        let locks = GameLocks::new();
        let _a = locks.acquire(GameId::new(1), WAIT).await.expect("free lock");
        let b = locks.acquire(GameId::new(2), Duration::from_millis(5)).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_slot() {
        let locks = GameLocks::new();
        let held = locks.acquire(GameId::new(9), WAIT).await.expect("free lock");

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .acquire(GameId::new(9), Duration::from_secs(30))
                    .await
                    .is_ok()
            })
        };
        tokio::task::yield_now().await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let locks = GameLocks::new();
        let held = locks.acquire(GameId::new(3), WAIT).await.expect("free lock");
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .acquire(GameId::new(3), Duration::from_secs(5))
                    .await
                    .map(|lease| lease.game())
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(held);
        let game = waiter.await.expect("task").expect("lock");
        assert_eq!(game, GameId::new(3));
        assert!(locks.is_empty());
    }
}
