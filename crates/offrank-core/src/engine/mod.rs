// Scoring engine: game score, opponent and park adjustment, split
// aggregation and ranking.

pub mod adjuster;
pub mod adjustment;
pub mod game_score;
pub mod park;
pub mod ranking;
pub mod splits;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("season {season} has no valid games; cannot compute a league average")]
    EmptySeason { season: i32 },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
