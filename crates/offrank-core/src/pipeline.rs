// Staged engine run: ingest -> park factors -> adjustment -> splits -> ranks.

use tracing::info;

use crate::config::EngineConfig;
use crate::engine::adjuster::{adjust_games, AdjustedGameValue};
use crate::engine::park::ParkFactorTable;
use crate::engine::ranking::Rankings;
use crate::engine::splits::SplitAggregates;
use crate::engine::EngineError;
use crate::records::{ingest, IngestStats, RawGameRecord, TeamInfo};
use crate::report::RankingTable;

/// Everything derived from one season's games.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub config: EngineConfig,
    pub ingest: IngestStats,
    pub parks: ParkFactorTable,
    pub games: Vec<AdjustedGameValue>,
    pub aggregates: SplitAggregates,
    pub rankings: Rankings,
}

impl EngineOutput {
    /// Assemble the output table, labelling teams from `teams`.
    pub fn table(&self, teams: &[TeamInfo]) -> RankingTable {
        RankingTable::build(&self.aggregates, &self.rankings, teams)
    }
}

/// Run the whole engine over one season's raw records.
///
/// Configuration is validated first; an empty season after validation is
/// fatal. Park factors are complete before any game is adjusted.
pub fn run(raw: Vec<RawGameRecord>, config: &EngineConfig) -> Result<EngineOutput, EngineError> {
    config.validate()?;

    let (records, ingest) = ingest(raw, config.season);
    if records.is_empty() {
        return Err(EngineError::EmptySeason {
            season: config.season,
        });
    }

    // Stage 1: the barrier. Stage 2 borrows the finished table.
    let parks = ParkFactorTable::build(&records, config)?;

    let games = adjust_games(&records, &parks, config);
    let aggregates = SplitAggregates::build(&games);
    let rankings = Rankings::build(&aggregates, config.tie_precision);

    info!(
        "Ranked {} teams from {} team-games (season {}, smoothing {:.2})",
        aggregates.len(),
        games.len(),
        config.season,
        config.smoothing
    );

    Ok(EngineOutput {
        config: config.clone(),
        ingest,
        parks,
        games,
        aggregates,
        rankings,
    })
}
