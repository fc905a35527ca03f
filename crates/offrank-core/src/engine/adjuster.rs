// Per-game adjusted scores (stage 2).
//
// Takes the finished park factor table by reference; games are independent
// of each other and are scored in parallel.

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::engine::adjustment::adjustment_factor;
use crate::engine::game_score::game_score;
use crate::engine::park::ParkFactorTable;
use crate::records::{BattingLine, GameRecord, Handedness};

/// One team-game after adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedGameValue {
    pub game_id: u64,
    pub team_id: u32,
    pub opponent_hand: Option<Handedness>,
    pub is_home: bool,
    pub line: BattingLine,
    /// Unadjusted linear-weights score.
    pub game_score: f64,
    pub adjustment_factor: f64,
    pub park_factor: f64,
    /// Score divided by both the opponent and the park factor. Feeds the
    /// overall and handedness splits.
    pub adjusted_score: f64,
    /// Score divided by the opponent factor only. Feeds the home/away splits
    /// so the venue effect is not normalized away.
    pub adjusted_score_no_park: f64,
}

/// Score a single game against a completed park factor table.
pub fn adjust_game(record: &GameRecord, parks: &ParkFactorTable, config: &EngineConfig) -> AdjustedGameValue {
    let score = game_score(&record.line, &config.weights);
    let adj = adjustment_factor(record.opponent_ra9_minus, config.smoothing, config.adjustment_clamp);
    let park = parks.factor(record.venue_id);

    AdjustedGameValue {
        game_id: record.game_id,
        team_id: record.team_id,
        opponent_hand: record.opponent_hand,
        is_home: record.is_home,
        line: record.line,
        game_score: score,
        adjustment_factor: adj,
        park_factor: park,
        adjusted_score: score / (adj * park),
        adjusted_score_no_park: score / adj,
    }
}

/// Score every game. Output order matches input order.
pub fn adjust_games(
    records: &[GameRecord],
    parks: &ParkFactorTable,
    config: &EngineConfig,
) -> Vec<AdjustedGameValue> {
    records
        .par_iter()
        .map(|record| adjust_game(record, parks, config))
        .collect()
}
