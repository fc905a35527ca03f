// MLB Stats API HTTP client.
//
// Thin typed wrappers over the public endpoints the ranking run needs:
// teams, team pitching totals, the season schedule, box scores and people.
// Response structs only name the fields that are read; everything else in
// the payload is ignored.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use offrank_core::records::{Handedness, TeamInfo};

/// Sport id for Major League Baseball.
pub const MLB_SPORT_ID: u32 = 1;

/// Schedule status code for a final game.
const STATUS_FINAL: &str = "F";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TeamsResponse {
    #[serde(default)]
    pub teams: Vec<ApiTeam>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTeam {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub division: Option<NamedRef>,
    #[serde(default)]
    pub sport: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdRef {
    pub id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleResponse {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleDate {
    #[serde(default)]
    pub games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduleGame {
    pub game_pk: u64,
    pub status: GameStatus,
    pub teams: ScheduleTeams,
    #[serde(default)]
    pub venue: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GameStatus {
    #[serde(default)]
    pub status_code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleTeams {
    pub home: ScheduleSide,
    pub away: ScheduleSide,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleSide {
    pub team: IdRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoxscoreResponse {
    pub teams: BoxscoreTeams,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoxscoreTeams {
    pub home: BoxscoreSide,
    pub away: BoxscoreSide,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BoxscoreSide {
    pub team_stats: BoxscoreTeamStats,
    #[serde(default)]
    pub pitchers: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoxscoreTeamStats {
    pub batting: BattingStats,
}

/// Counting stats are kept signed; validation happens in the engine.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattingStats {
    #[serde(default)]
    pub runs: i64,
    #[serde(default)]
    pub hits: i64,
    #[serde(default)]
    pub base_on_balls: i64,
    #[serde(default)]
    pub strike_outs: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeopleResponse {
    #[serde(default)]
    pub people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Person {
    #[serde(default)]
    pub pitch_hand: Option<PitchHand>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PitchHand {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamStatsResponse {
    #[serde(default)]
    pub stats: Vec<StatGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatGroup {
    #[serde(default)]
    pub splits: Vec<StatSplit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatSplit {
    pub stat: PitchingStat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PitchingStat {
    #[serde(default)]
    pub runs: u64,
    #[serde(default)]
    pub innings_pitched: Option<String>,
}

// ---------------------------------------------------------------------------
// Domain values handed to the source
// ---------------------------------------------------------------------------

/// A completed game from the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedGame {
    pub game_pk: u64,
    pub home_team: u32,
    pub away_team: u32,
    pub venue_id: Option<u32>,
}

/// Both batting lines and starting pitchers from a box score.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boxscore {
    pub home_batting: BattingStats,
    pub away_batting: BattingStats,
    pub home_starter: Option<u64>,
    pub away_starter: Option<u64>,
}

/// Season pitching totals for one team's staff.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffPitching {
    pub runs: u64,
    pub innings_text: String,
}

// ---------------------------------------------------------------------------
// Response -> domain conversion (pure, unit-tested)
// ---------------------------------------------------------------------------

pub(crate) fn teams_from(resp: TeamsResponse) -> Vec<TeamInfo> {
    resp.teams
        .into_iter()
        .filter(|t| t.sport.as_ref().and_then(|s| s.id) == Some(MLB_SPORT_ID))
        .map(|t| {
            let abbreviation = t
                .abbreviation
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| t.name.chars().take(3).collect::<String>().to_uppercase());
            let division = t
                .division
                .and_then(|d| d.name)
                .unwrap_or_else(|| "Unknown".into());
            TeamInfo {
                id: t.id,
                name: t.name,
                abbreviation,
                division,
            }
        })
        .collect()
}

pub(crate) fn completed_games_from(resp: ScheduleResponse) -> Vec<CompletedGame> {
    resp.dates
        .into_iter()
        .flat_map(|d| d.games)
        .filter(|g| g.status.status_code == STATUS_FINAL)
        .filter_map(|g| {
            Some(CompletedGame {
                game_pk: g.game_pk,
                home_team: g.teams.home.team.id?,
                away_team: g.teams.away.team.id?,
                venue_id: g.venue.and_then(|v| v.id),
            })
        })
        .collect()
}

pub(crate) fn boxscore_from(resp: BoxscoreResponse) -> Boxscore {
    let BoxscoreTeams { home, away } = resp.teams;
    Boxscore {
        home_batting: home.team_stats.batting,
        away_batting: away.team_stats.batting,
        home_starter: home.pitchers.first().copied(),
        away_starter: away.pitchers.first().copied(),
    }
}

pub(crate) fn pitch_hand_from(resp: PeopleResponse) -> Option<Handedness> {
    resp.people
        .into_iter()
        .next()
        .and_then(|p| p.pitch_hand)
        .and_then(|h| Handedness::from_code(&h.code))
}

pub(crate) fn staff_pitching_from(resp: TeamStatsResponse) -> Option<StaffPitching> {
    let stat = resp
        .stats
        .into_iter()
        .next()?
        .splits
        .into_iter()
        .next()?
        .stat;
    Some(StaffPitching {
        runs: stat.runs,
        innings_text: stat.innings_pitched.unwrap_or_else(|| "0".into()),
    })
}

// ---------------------------------------------------------------------------
// StatsApiClient
// ---------------------------------------------------------------------------

/// Low-level Stats API client.
#[derive(Debug, Clone)]
pub struct StatsApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl StatsApiClient {
    /// Create a client for the given API base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {url} {query:?}");
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Http {
            url: url.clone(),
            source: e,
        })?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode { url, source: e })
    }

    /// All MLB teams for a season.
    pub async fn teams(&self, season: i32) -> Result<Vec<TeamInfo>, FetchError> {
        let resp: TeamsResponse = self
            .get_json(
                "/teams",
                &[
                    ("sportId", MLB_SPORT_ID.to_string()),
                    ("season", season.to_string()),
                ],
            )
            .await?;
        Ok(teams_from(resp))
    }

    /// Season pitching totals for a team's staff, if the API has any.
    pub async fn staff_pitching(&self, team_id: u32, season: i32) -> Result<Option<StaffPitching>, FetchError> {
        let resp: TeamStatsResponse = self
            .get_json(
                &format!("/teams/{team_id}/stats"),
                &[
                    ("stats", "season".into()),
                    ("group", "pitching".into()),
                    ("season", season.to_string()),
                ],
            )
            .await?;
        Ok(staff_pitching_from(resp))
    }

    /// Completed regular-season games between `start` and `end` inclusive.
    pub async fn completed_games(
        &self,
        season: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CompletedGame>, FetchError> {
        let resp: ScheduleResponse = self
            .get_json(
                "/schedule",
                &[
                    ("sportId", MLB_SPORT_ID.to_string()),
                    ("season", season.to_string()),
                    ("startDate", start.format("%Y-%m-%d").to_string()),
                    ("endDate", end.format("%Y-%m-%d").to_string()),
                    ("gameType", "R".into()),
                ],
            )
            .await?;
        Ok(completed_games_from(resp))
    }

    pub async fn boxscore(&self, game_pk: u64) -> Result<Boxscore, FetchError> {
        let resp: BoxscoreResponse = self.get_json(&format!("/game/{game_pk}/boxscore"), &[]).await?;
        Ok(boxscore_from(resp))
    }

    /// Throwing hand for a pitcher; `None` when the API does not say.
    pub async fn pitch_hand(&self, person_id: u64) -> Result<Option<Handedness>, FetchError> {
        let resp: PeopleResponse = self.get_json(&format!("/people/{person_id}"), &[]).await?;
        Ok(pitch_hand_from(resp))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
