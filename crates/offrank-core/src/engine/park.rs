// Season park factors.
//
// Built in a single pass over every validated game of the season. This is
// stage 1 of the pipeline: per-game adjustment borrows the finished table, so
// nothing can be adjusted before every venue has been accumulated.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::EngineError;
use crate::records::GameRecord;

/// Neutral park factor.
pub const NEUTRAL_PARK_FACTOR: f64 = 1.0;

/// Run and game totals for one venue in one season.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueSeasonStat {
    pub venue_id: u32,
    pub season: i32,
    /// Runs scored by both teams across all games at the venue.
    pub runs: u64,
    /// Distinct games played at the venue.
    pub games: u32,
    pub park_factor: f64,
}

impl VenueSeasonStat {
    pub fn runs_per_game(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.runs as f64 / f64::from(self.games)
    }
}

/// Park factor per venue for a single season.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkFactorTable {
    season: i32,
    league_runs: u64,
    league_games: u32,
    venues: BTreeMap<u32, VenueSeasonStat>,
}

#[derive(Default)]
struct VenueAccumulator {
    runs: u64,
    games: BTreeSet<u64>,
}

impl ParkFactorTable {
    /// Accumulate runs and games per venue and derive each venue's factor.
    ///
    /// A venue with fewer than `min_venue_games` games is neutral (1.0).
    /// Otherwise its factor is its runs per game divided by the league's runs
    /// per game. Fails when the season has no games at all.
    pub fn build(records: &[GameRecord], config: &EngineConfig) -> Result<Self, EngineError> {
        let mut venues: BTreeMap<u32, VenueAccumulator> = BTreeMap::new();
        let mut league_games: BTreeSet<u64> = BTreeSet::new();
        let mut league_runs: u64 = 0;

        for record in records {
            let acc = venues.entry(record.venue_id).or_default();
            acc.runs += u64::from(record.line.runs);
            acc.games.insert(record.game_id);
            league_runs += u64::from(record.line.runs);
            league_games.insert(record.game_id);
        }

        let league_games = league_games.len() as u32;
        if league_games == 0 {
            return Err(EngineError::EmptySeason {
                season: config.season,
            });
        }

        let league_avg = league_runs as f64 / f64::from(league_games);
        if league_runs == 0 {
            warn!(
                "season {} has {league_games} games but no runs; all park factors are neutral",
                config.season
            );
        }

        let venues = venues
            .into_iter()
            .map(|(venue_id, acc)| {
                let games = acc.games.len() as u32;
                let park_factor = venue_factor(venue_id, acc.runs, games, league_avg, config);
                let stat = VenueSeasonStat {
                    venue_id,
                    season: config.season,
                    runs: acc.runs,
                    games,
                    park_factor,
                };
                debug!(
                    "venue {venue_id}: {} runs in {games} games, park factor {park_factor:.3}",
                    stat.runs
                );
                (venue_id, stat)
            })
            .collect::<BTreeMap<_, _>>();

        info!(
            "Park factors for {} venues (league average {league_avg:.3} runs/game over {league_games} games)",
            venues.len()
        );

        Ok(ParkFactorTable {
            season: config.season,
            league_runs,
            league_games,
            venues,
        })
    }

    /// Park factor for a venue; unknown venues are neutral.
    pub fn factor(&self, venue_id: u32) -> f64 {
        self.venues
            .get(&venue_id)
            .map_or(NEUTRAL_PARK_FACTOR, |v| v.park_factor)
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    pub fn league_games(&self) -> u32 {
        self.league_games
    }

    pub fn league_runs_per_game(&self) -> f64 {
        self.league_runs as f64 / f64::from(self.league_games)
    }

    pub fn venue(&self, venue_id: u32) -> Option<&VenueSeasonStat> {
        self.venues.get(&venue_id)
    }

    /// Venues in ascending id order.
    pub fn venues(&self) -> impl Iterator<Item = &VenueSeasonStat> {
        self.venues.values()
    }

    /// Venues ordered by park factor, most hitter-friendly first. Equal
    /// factors are ordered by venue id.
    pub fn ranked_venues(&self) -> Vec<&VenueSeasonStat> {
        let mut ranked: Vec<&VenueSeasonStat> = self.venues.values().collect();
        ranked.sort_by(|a, b| {
            b.park_factor
                .total_cmp(&a.park_factor)
                .then(a.venue_id.cmp(&b.venue_id))
        });
        ranked
    }
}

fn venue_factor(venue_id: u32, runs: u64, games: u32, league_avg: f64, config: &EngineConfig) -> f64 {
    if games < config.min_venue_games || league_avg <= 0.0 {
        return NEUTRAL_PARK_FACTOR;
    }
    let factor = (runs as f64 / f64::from(games)) / league_avg;
    // A scoreless park would zero the adjustment denominator.
    if !factor.is_finite() || factor <= 0.0 {
        warn!("venue {venue_id}: degenerate park factor {factor}; using neutral");
        return NEUTRAL_PARK_FACTOR;
    }
    factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BattingLine;

    fn record(game_id: u64, team_id: u32, venue_id: u32, runs: u32) -> GameRecord {
        GameRecord {
            season: 2024,
            game_id,
            team_id,
            venue_id,
            is_home: team_id == 1,
            opponent_ra9_minus: 100.0,
            opponent_hand: None,
            line: BattingLine {
                runs,
                ..BattingLine::default()
            },
        }
    }

    /// Both sides of `games` games at `venue_id`, splitting `runs_per_game`
    /// between home and away.
    fn venue_games(first_game: u64, games: u64, venue_id: u32, runs_per_game: u32) -> Vec<GameRecord> {
        (first_game..first_game + games)
            .flat_map(|g| {
                let home = runs_per_game / 2;
                [record(g, 1, venue_id, home), record(g, 2, venue_id, runs_per_game - home)]
            })
            .collect()
    }

    fn config() -> EngineConfig {
        EngineConfig::for_season(2024)
    }

    #[test]
    fn empty_season_is_fatal() {
        let err = ParkFactorTable::build(&[], &config()).unwrap_err();
        assert!(matches!(err, EngineError::EmptySeason { season: 2024 }));
    }

    #[test]
    fn under_sample_venue_is_neutral() {
        // 9 high-scoring games at venue 7, 20 low-scoring games elsewhere.
        let mut records = venue_games(1, 9, 7, 20);
        records.extend(venue_games(100, 20, 8, 4));
        let table = ParkFactorTable::build(&records, &config()).unwrap();

        assert_eq!(table.factor(7), 1.0);
        assert_eq!(table.venue(7).unwrap().games, 9);
        assert!(table.factor(8) < 1.0);
    }

    #[test]
    fn qualifying_venue_factor() {
        // Venue 1: 12 games, 60 runs. Venue 2: 18 games, 75 runs.
        // League: 135 runs / 30 games = 4.5 per game.
        let mut records = venue_games(1, 12, 1, 5);
        records.extend(venue_games(100, 15, 2, 4));
        records.extend(venue_games(200, 3, 2, 5));

        let table = ParkFactorTable::build(&records, &config()).unwrap();
        assert!((table.league_runs_per_game() - 4.5).abs() < 1e-12);
        assert_eq!(table.venue(1).unwrap().runs, 60);
        assert_eq!(table.venue(1).unwrap().games, 12);
        assert!((table.factor(1) - 1.111).abs() < 1e-3);
        assert!((table.factor(2) - (75.0 / 18.0) / 4.5).abs() < 1e-12);
    }

    #[test]
    fn games_are_counted_once_per_game_not_per_team() {
        let records = venue_games(1, 10, 3, 8);
        let table = ParkFactorTable::build(&records, &config()).unwrap();
        assert_eq!(table.league_games(), 10);
        assert_eq!(table.venue(3).unwrap().games, 10);
        assert!((table.league_runs_per_game() - 8.0).abs() < 1e-12);
        assert!((table.factor(3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_venue_is_neutral() {
        let table = ParkFactorTable::build(&venue_games(1, 12, 3, 8), &config()).unwrap();
        assert_eq!(table.factor(999), 1.0);
    }

    #[test]
    fn scoreless_league_is_all_neutral() {
        let table = ParkFactorTable::build(&venue_games(1, 15, 3, 0), &config()).unwrap();
        assert_eq!(table.factor(3), 1.0);
    }

    #[test]
    fn scoreless_park_falls_back_to_neutral() {
        let mut records = venue_games(1, 12, 3, 0);
        records.extend(venue_games(100, 12, 4, 10));
        let table = ParkFactorTable::build(&records, &config()).unwrap();
        assert_eq!(table.factor(3), 1.0);
        assert!((table.factor(4) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn min_venue_games_is_configurable() {
        let mut cfg = config();
        cfg.min_venue_games = 3;
        let mut records = venue_games(1, 4, 3, 10);
        records.extend(venue_games(100, 4, 4, 6));
        let table = ParkFactorTable::build(&records, &cfg).unwrap();
        assert!((table.factor(3) - 1.25).abs() < 1e-12);
        assert!((table.factor(4) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn ranked_venues_hitter_friendly_first() {
        let mut cfg = config();
        cfg.min_venue_games = 1;
        let mut records = venue_games(1, 2, 5, 4);
        records.extend(venue_games(10, 2, 6, 12));
        records.extend(venue_games(20, 2, 7, 8));
        let table = ParkFactorTable::build(&records, &cfg).unwrap();
        let order: Vec<u32> = table.ranked_venues().iter().map(|v| v.venue_id).collect();
        assert_eq!(order, vec![6, 7, 5]);
    }
}
