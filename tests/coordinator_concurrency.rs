//! Races against the move coordinator on a multi-threaded runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use grid_arena::{Arena, ArenaConfig, ErrorKind, GameId, GameStatus, UserId};
use tokio::task::JoinSet;

async fn setup(config: ArenaConfig) -> (Arc<Arena>, UserId, UserId) {
    let arena = Arc::new(Arena::in_memory(config));
    let alice = *arena.create_user("alice").await.expect("Create failed").id();
    let bob = *arena.create_user("bob").await.expect("Create failed").id();
    (arena, alice, bob)
}

async fn started_game(arena: &Arena, creator: UserId, opponent: UserId) -> GameId {
    let id = arena.create_game(creator).await.expect("Create game failed").id();
    arena.join_game(id, opponent).await.expect("Join failed");
    id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_cell_race_has_one_winner() {
    let (arena, alice, bob) = setup(ArenaConfig::default()).await;

    for _ in 0..20 {
        let id = started_game(&arena, alice, bob).await;
        arena.submit_move(id, alice, 0, 0).await.expect("Opening move");

        // Bob holds the turn; both of his racing submissions are legal on
        // their own, only one can land.
        let mut racers = JoinSet::new();
        for (row, col) in [(1, 1), (1, 1)] {
            let arena = Arc::clone(&arena);
            racers.spawn(async move { arena.submit_move(id, bob, row, col).await });
        }

        let mut ok = 0;
        let mut rejected = Vec::new();
        while let Some(joined) = racers.join_next().await {
            match joined.expect("Task panicked") {
                Ok(_) => ok += 1,
                Err(err) => rejected.push(err.kind()),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0],
            ErrorKind::CellOccupied | ErrorKind::NotYourTurn
        ));

        let game = arena.game(id).await.expect("Load failed");
        assert_eq!(game.move_count(), 2);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_both_players_racing_alternate_correctly() {
    let (arena, alice, bob) = setup(ArenaConfig::default()).await;
    let id = started_game(&arena, alice, bob).await;

    // Both players hammer every cell; the game must still alternate marks
    // and end exactly once.
    let mut players = JoinSet::new();
    for user in [alice, bob] {
        let arena = Arc::clone(&arena);
        players.spawn(async move {
            let mut accepted = 0u32;
            loop {
                for row in 0..3 {
                    for col in 0..3 {
                        if arena.submit_move(id, user, row, col).await.is_ok() {
                            accepted += 1;
                        }
                    }
                }
                let game = arena.game(id).await.expect("Load failed");
                if game.status() == GameStatus::Completed {
                    return accepted;
                }
            }
        });
    }
    let mut accepted = 0;
    while let Some(joined) = players.join_next().await {
        accepted += joined.expect("Task panicked");
    }

    let game = arena.game(id).await.expect("Load failed");
    assert_eq!(game.status(), GameStatus::Completed);
    assert_eq!(game.move_count(), accepted);
    for (i, mv) in game.history().iter().enumerate() {
        let expected = if i % 2 == 0 { alice } else { bob };
        assert_eq!(*mv.player(), expected);
    }
    assert_eq!(arena.stats().folded_games(), 1);
    assert!(arena.coordinator().locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_held_game_does_not_block_other_games() {
    let (arena, alice, bob) = setup(ArenaConfig::default().with_lock_timeout_ms(5_000)).await;
    let busy = started_game(&arena, alice, bob).await;
    let free = started_game(&arena, alice, bob).await;

    let _lease = arena
        .coordinator()
        .locks()
        .acquire(busy, Duration::from_millis(100))
        .await
        .expect("Lock free");

    let started = Instant::now();
    arena.submit_move(free, alice, 1, 1).await.expect("Other game moves");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lock_timeout_surfaces_contention_and_recovers() {
    let (arena, alice, bob) = setup(ArenaConfig::default().with_lock_timeout_ms(30)).await;
    let id = started_game(&arena, alice, bob).await;

    let lease = arena
        .coordinator()
        .locks()
        .acquire(id, Duration::from_millis(100))
        .await
        .expect("Lock free");
    let err = arena.submit_move(id, alice, 0, 0).await.expect_err("Lease held");
    assert_eq!(err.kind(), ErrorKind::Contention);
    assert_eq!(arena.game(id).await.expect("Load failed").move_count(), 0);

    drop(lease);
    arena.submit_move(id, alice, 0, 0).await.expect("Lease released");
    assert!(arena.coordinator().locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_games_in_parallel() {
    let (arena, alice, bob) = setup(ArenaConfig::default()).await;

    let mut games = JoinSet::new();
    for _ in 0..32 {
        let arena = Arc::clone(&arena);
        games.spawn(async move {
            let id = started_game(&arena, alice, bob).await;
            for (user, row, col) in
                [(alice, 0, 0), (bob, 1, 0), (alice, 0, 1), (bob, 1, 1), (alice, 0, 2)]
            {
                arena
                    .submit_move(id, user, row, col)
                    .await
                    .expect("Legal move rejected");
            }
        });
    }
    while let Some(joined) = games.join_next().await {
        joined.expect("Task panicked");
    }

    let stats = arena.stats_for(alice).await.expect("Stats failed");
    assert_eq!(*stats.wins(), 32);
    assert_eq!(*arena.stats_for(bob).await.expect("Stats failed").losses(), 32);
    assert!(arena.coordinator().locks().is_empty());
}
