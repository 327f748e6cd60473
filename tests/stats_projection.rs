//! The incremental statistics must equal a rebuild from stored games.

use std::sync::Arc;

use grid_arena::simulation::{self, SimulationConfig};
use grid_arena::{Arena, ArenaConfig, GameStore, MemoryStore, Metric, StatsAggregator};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rebuild_matches_live_after_simulation() {
    let store = Arc::new(MemoryStore::new());
    let arena = Arc::new(Arena::new(store.clone(), ArenaConfig::default()));
    let settings = SimulationConfig::default()
        .with_games(40)
        .with_players(6)
        .with_workers(8)
        .with_seed(7);

    let report = simulation::run(Arc::clone(&arena), &settings)
        .await
        .expect("Simulation failed");
    assert_eq!(*report.completed(), 40);
    assert_eq!(report.decisive() + report.draws(), 40);
    assert_eq!(store.game_count(), 40);

    let completed = store.completed_games().await.expect("Query failed");
    let rebuilt = StatsAggregator::rebuild(completed.iter());
    assert_eq!(arena.stats().snapshot(), rebuilt.snapshot());
    assert_eq!(arena.stats().folded_games(), 40);

    let total_games: u32 = rebuilt.snapshot().values().map(|c| *c.games_played()).sum();
    assert_eq!(total_games, 80);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simulation_report_leaderboard() {
    let arena = Arc::new(Arena::in_memory(ArenaConfig::default()));
    let settings = SimulationConfig::default().with_games(20).with_players(4).with_seed(99);
    let report = simulation::run(Arc::clone(&arena), &settings)
        .await
        .expect("Simulation failed");

    assert_eq!(report.users().len(), 4);
    assert!(report.leaderboard().len() <= 3);
    let values: Vec<f64> = report.leaderboard().iter().map(|e| *e.value()).collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(report.leaderboard(), &arena.top_k(Metric::WinRatio, 3));

    let rendered = simulation::render(&report);
    assert!(rendered.contains("Played 20 games"));
}

#[tokio::test]
async fn test_rebuild_stats_replaces_live_counters() {
    let arena = Arena::in_memory(ArenaConfig::default());
    let alice = *arena.create_user("alice").await.expect("Create failed").id();
    let bob = *arena.create_user("bob").await.expect("Create failed").id();
    let id = arena.create_game(alice).await.expect("Create game failed").id();
    arena.join_game(id, bob).await.expect("Join failed");
    for (user, row, col) in [(alice, 0, 0), (bob, 1, 0), (alice, 0, 1), (bob, 1, 1), (alice, 0, 2)] {
        arena.submit_move(id, user, row, col).await.expect("Move failed");
    }

    let before = arena.stats().snapshot();
    let folded = arena.rebuild_stats().await.expect("Rebuild failed");
    assert_eq!(folded, 1);
    assert_eq!(arena.stats().snapshot(), before);
}

#[tokio::test]
async fn test_simulation_rejects_single_player() {
    let arena = Arc::new(Arena::in_memory(ArenaConfig::default()));
    let settings = SimulationConfig::default().with_players(1);
    let err = simulation::run(arena, &settings).await.expect_err("Needs two players");
    assert!(err.to_string().contains("at least 2 players"));
}
