// `GameSource` backed by the MLB Stats API.
//
// Fetch order: teams, staff pitching (for RA9-), the season schedule, box
// scores for every completed game, then the throwing hand of each distinct
// starter. Per-item failures are logged and skipped; only the teams and
// schedule requests are fatal.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use offrank_core::config::SourceConfig;
use offrank_core::records::{Handedness, RawGameRecord};
use offrank_core::source::{GameSource, SeasonData};

use crate::client::{BattingStats, Boxscore, CompletedGame, StatsApiClient};
use crate::ra9::{ra9_minus_table, NEUTRAL_RA9_MINUS};

// ---------------------------------------------------------------------------
// Record assembly (pure)
// ---------------------------------------------------------------------------

/// First day of the regular-season schedule window.
fn season_start(season: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(season, 3, 1)
}

/// Last day of the window: today for the current season, otherwise the end
/// of that calendar year.
fn season_end(season: i32, today: NaiveDate) -> Option<NaiveDate> {
    let year_end = NaiveDate::from_ymd_opt(season, 12, 31)?;
    Some(if today.year() == season { today } else { year_end.min(today) })
}

/// One record per side of a completed game. Each side faces the other
/// side's staff and starter.
fn game_records(
    season: i32,
    game: &CompletedGame,
    boxscore: &Boxscore,
    ra9_minus: &BTreeMap<u32, f64>,
    hands: &BTreeMap<u64, Option<Handedness>>,
) -> [RawGameRecord; 2] {
    let hand_of = |starter: Option<u64>| {
        starter
            .and_then(|id| hands.get(&id).copied().flatten())
            .map(|h| h.code().to_string())
    };
    let side = |team_id: u32, is_home: bool, batting: &BattingStats, opponent: u32, starter: Option<u64>| {
        RawGameRecord {
            season,
            game_id: game.game_pk,
            team_id,
            venue_id: game.venue_id,
            is_home,
            opponent_ra9_minus: ra9_minus.get(&opponent).copied().unwrap_or(NEUTRAL_RA9_MINUS),
            opponent_hand: hand_of(starter),
            runs: batting.runs,
            hits: batting.hits,
            walks: batting.base_on_balls,
            strikeouts: batting.strike_outs,
        }
    };
    [
        side(
            game.home_team,
            true,
            &boxscore.home_batting,
            game.away_team,
            boxscore.away_starter,
        ),
        side(
            game.away_team,
            false,
            &boxscore.away_batting,
            game.home_team,
            boxscore.home_starter,
        ),
    ]
}

// ---------------------------------------------------------------------------
// StatsApiSource
// ---------------------------------------------------------------------------

/// Loads a season from the public MLB Stats API.
#[derive(Debug, Clone)]
pub struct StatsApiSource {
    client: StatsApiClient,
    concurrency: usize,
}

impl StatsApiSource {
    pub fn new(base_url: impl Into<String>, concurrency: usize) -> Self {
        StatsApiSource {
            client: StatsApiClient::new(base_url),
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.base_url.clone(), config.concurrency)
    }

    async fn fetch_ra9_minus(&self, team_ids: &[u32], season: i32) -> BTreeMap<u32, f64> {
        let client = &self.client;
        let staffs: BTreeMap<u32, _> = stream::iter(team_ids.iter().copied())
            .map(|team_id| async move {
                let staff = match client.staff_pitching(team_id, season).await {
                    Ok(staff) => staff,
                    Err(e) => {
                        warn!("pitching stats unavailable for team {}: {}", team_id, e);
                        None
                    }
                };
                (team_id, staff)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        ra9_minus_table(&staffs)
    }

    async fn fetch_boxscores(&self, games: Vec<CompletedGame>) -> Vec<(CompletedGame, Boxscore)> {
        let client = &self.client;
        stream::iter(games)
            .map(|game| async move {
                match client.boxscore(game.game_pk).await {
                    Ok(boxscore) => Some((game, boxscore)),
                    Err(e) => {
                        warn!("skipping game {}: {}", game.game_pk, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|item| async move { item })
            .collect()
            .await
    }

    async fn fetch_hands(&self, starters: BTreeSet<u64>) -> BTreeMap<u64, Option<Handedness>> {
        let client = &self.client;
        stream::iter(starters)
            .map(|person_id| async move {
                let hand = match client.pitch_hand(person_id).await {
                    Ok(hand) => hand,
                    Err(e) => {
                        warn!("pitch hand unavailable for pitcher {}: {}", person_id, e);
                        None
                    }
                };
                (person_id, hand)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

#[async_trait]
impl GameSource for StatsApiSource {
    async fn load_season(&self, season: i32) -> anyhow::Result<SeasonData> {
        let teams = self
            .client
            .teams(season)
            .await
            .with_context(|| format!("failed to fetch teams for season {season}"))?;
        info!("Fetched {} MLB teams", teams.len());

        let team_ids: Vec<u32> = teams.iter().map(|t| t.id).collect();
        let ra9_minus = self.fetch_ra9_minus(&team_ids, season).await;

        let start = season_start(season).with_context(|| format!("invalid season {season}"))?;
        let end = season_end(season, Local::now().date_naive())
            .with_context(|| format!("invalid season {season}"))?;
        let games = self
            .client
            .completed_games(season, start, end)
            .await
            .with_context(|| format!("failed to fetch schedule for season {season}"))?;
        info!("Found {} completed games ({} to {})", games.len(), start, end);

        let boxscores = self.fetch_boxscores(games).await;
        let starters: BTreeSet<u64> = boxscores
            .iter()
            .flat_map(|(_, b)| [b.home_starter, b.away_starter])
            .flatten()
            .collect();
        let hands = self.fetch_hands(starters).await;

        let mut records: Vec<RawGameRecord> = boxscores
            .iter()
            .flat_map(|(game, boxscore)| game_records(season, game, boxscore, &ra9_minus, &hands))
            .collect();
        records.sort_by_key(|r| (r.game_id, r.team_id));

        info!(
            "Built {} team-game records from {} box scores",
            records.len(),
            boxscores.len()
        );
        Ok(SeasonData {
            teams,
            games: records,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
