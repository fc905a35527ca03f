// Data sources: the seam between retrieval and the engine.
//
// A source delivers one season's raw game records plus team metadata. The
// engine validates the records itself, so sources pass upstream data through
// as-is. The CSV source lives here; the stats API source is its own crate.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::records::{RawGameRecord, TeamInfo};

/// Everything a source provides for one season.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonData {
    pub teams: Vec<TeamInfo>,
    pub games: Vec<RawGameRecord>,
}

/// Supplies a season's completed regular-season games.
#[async_trait]
pub trait GameSource: Send + Sync {
    async fn load_season(&self, season: i32) -> anyhow::Result<SeasonData>;
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Games CSV row. Venue and hand may be blank; counting stats are signed so
/// that negative values reach validation instead of failing the parse.
#[derive(Debug, Deserialize)]
struct CsvGameRow {
    season: i32,
    game_id: u64,
    team_id: u32,
    venue_id: Option<u32>,
    #[serde(deserialize_with = "deserialize_flag")]
    is_home: bool,
    #[serde(alias = "ra9_minus")]
    opponent_ra9_minus: f64,
    #[serde(default, alias = "pitcher_hand")]
    opponent_hand: Option<String>,
    runs: i64,
    hits: i64,
    #[serde(alias = "bb")]
    walks: i64,
    #[serde(alias = "so")]
    strikeouts: i64,
}

#[derive(Debug, Deserialize)]
struct CsvTeamRow {
    id: u32,
    name: String,
    #[serde(default)]
    abbreviation: String,
    #[serde(default)]
    division: String,
}

/// Accept `true/false`, `1/0`, `H/A` and `home/away` for the home flag.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "h" | "home" => Ok(true),
        "false" | "0" | "a" | "away" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid home flag '{other}'"))),
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<RawGameRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<CsvGameRow>() {
        match result {
            Ok(row) => games.push(RawGameRecord {
                season: row.season,
                game_id: row.game_id,
                team_id: row.team_id,
                venue_id: row.venue_id,
                is_home: row.is_home,
                opponent_ra9_minus: row.opponent_ra9_minus,
                opponent_hand: row.opponent_hand.filter(|h| !h.is_empty()),
                runs: row.runs,
                hits: row.hits,
                walks: row.walks,
                strikeouts: row.strikeouts,
            }),
            Err(e) => {
                warn!("skipping malformed game row: {}", e);
            }
        }
    }
    Ok(games)
}

fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamInfo>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut teams: Vec<TeamInfo> = Vec::new();
    let mut index: HashMap<u32, usize> = HashMap::new();
    for result in reader.deserialize::<CsvTeamRow>() {
        match result {
            Ok(row) => {
                let team = TeamInfo {
                    id: row.id,
                    name: row.name,
                    abbreviation: row.abbreviation,
                    division: if row.division.is_empty() {
                        "Unknown".into()
                    } else {
                        row.division
                    },
                };
                if let Some(&i) = index.get(&team.id) {
                    warn!("duplicate team entry for id {}, using latest value", team.id);
                    teams[i] = team;
                } else {
                    index.insert(team.id, teams.len());
                    teams.push(team);
                }
            }
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
            }
        }
    }
    Ok(teams)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load raw game records from a CSV file.
pub fn load_games_csv(path: &Path) -> Result<Vec<RawGameRecord>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_games_from_reader(file).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load team metadata from a CSV file.
pub fn load_teams_csv(path: &Path) -> Result<Vec<TeamInfo>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_teams_from_reader(file).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// Reads a season from local CSV files.
#[derive(Debug, Clone)]
pub struct CsvSource {
    games: PathBuf,
    teams: Option<PathBuf>,
}

impl CsvSource {
    pub fn new(games: impl Into<PathBuf>, teams: Option<PathBuf>) -> Self {
        CsvSource {
            games: games.into(),
            teams,
        }
    }
}

#[async_trait]
impl GameSource for CsvSource {
    async fn load_season(&self, season: i32) -> anyhow::Result<SeasonData> {
        let games = load_games_csv(&self.games)
            .with_context(|| format!("failed to load games for season {season}"))?;

        let teams = match &self.teams {
            Some(path) if path.exists() => load_teams_csv(path).context("failed to load teams")?,
            Some(path) => {
                warn!("teams file {} not found; using team ids as names", path.display());
                Vec::new()
            }
            None => Vec::new(),
        };

        info!(
            "Loaded {} game rows and {} teams from {}",
            games.len(),
            teams.len(),
            self.games.display()
        );
        Ok(SeasonData { teams, games })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
