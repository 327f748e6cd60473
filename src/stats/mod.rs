//! Per-user statistics derived from completed games.

mod aggregator;
mod models;

pub use aggregator::StatsAggregator;
pub use models::{LeaderboardEntry, Metric, UserCounters, UserStats};
