// Game records: the loosely-typed shape supplied by data sources and the
// validated `GameRecord` the engine computes on.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Throwing hand of the opposing starting pitcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Parse the one-letter pitch-hand code used by stats providers.
    /// Anything other than `L`/`R` (e.g. `S`, blank, `Unknown`) is `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "L" | "LEFT" | "LHP" => Some(Handedness::Left),
            "R" | "RIGHT" | "RHP" => Some(Handedness::Right),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Handedness::Left => "L",
            Handedness::Right => "R",
        }
    }
}

/// Counting stats from one team's batting line in one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BattingLine {
    pub runs: u32,
    pub hits: u32,
    pub walks: u32,
    pub strikeouts: u32,
}

/// One team's offensive result in one completed regular-season game.
///
/// Only constructed through `TryFrom<RawGameRecord>`, so every instance has a
/// venue, a positive finite RA9-, and non-negative counting stats.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub season: i32,
    pub game_id: u64,
    pub team_id: u32,
    pub venue_id: u32,
    pub is_home: bool,
    pub opponent_ra9_minus: f64,
    /// `None` when the opposing starter's hand could not be determined.
    pub opponent_hand: Option<Handedness>,
    pub line: BattingLine,
}

/// A game record as delivered by a data source, before validation.
///
/// Counting stats are signed so that bad upstream data can be reported
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGameRecord {
    pub season: i32,
    pub game_id: u64,
    pub team_id: u32,
    #[serde(default)]
    pub venue_id: Option<u32>,
    pub is_home: bool,
    pub opponent_ra9_minus: f64,
    #[serde(default)]
    pub opponent_hand: Option<String>,
    pub runs: i64,
    pub hits: i64,
    pub walks: i64,
    pub strikeouts: i64,
}

/// Display metadata for a team. Only used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    #[serde(default)]
    pub division: String,
}

impl TeamInfo {
    /// Placeholder for a team that appears in game data without metadata.
    pub fn unknown(id: u32) -> Self {
        TeamInfo {
            id,
            name: format!("Team {id}"),
            abbreviation: String::new(),
            division: "Unknown".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("negative {field}: {value}")]
    NegativeStat { field: &'static str, value: i64 },

    #[error("{field} out of range: {value}")]
    StatOverflow { field: &'static str, value: i64 },

    #[error("opponent RA9- must be positive and finite, got {0}")]
    InvalidRa9Minus(f64),

    #[error("missing venue")]
    MissingVenue,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn counting_stat(field: &'static str, value: i64) -> Result<u32, RecordError> {
    if value < 0 {
        return Err(RecordError::NegativeStat { field, value });
    }
    u32::try_from(value).map_err(|_| RecordError::StatOverflow { field, value })
}

impl TryFrom<RawGameRecord> for GameRecord {
    type Error = RecordError;

    fn try_from(raw: RawGameRecord) -> Result<Self, Self::Error> {
        let line = BattingLine {
            runs: counting_stat("runs", raw.runs)?,
            hits: counting_stat("hits", raw.hits)?,
            walks: counting_stat("walks", raw.walks)?,
            strikeouts: counting_stat("strikeouts", raw.strikeouts)?,
        };

        if !raw.opponent_ra9_minus.is_finite() || raw.opponent_ra9_minus <= 0.0 {
            return Err(RecordError::InvalidRa9Minus(raw.opponent_ra9_minus));
        }

        let venue_id = raw.venue_id.ok_or(RecordError::MissingVenue)?;

        Ok(GameRecord {
            season: raw.season,
            game_id: raw.game_id,
            team_id: raw.team_id,
            venue_id,
            is_home: raw.is_home,
            opponent_ra9_minus: raw.opponent_ra9_minus,
            opponent_hand: raw.opponent_hand.as_deref().and_then(Handedness::from_code),
            line,
        })
    }
}

/// Counts reported by ingestion, for logging and summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub malformed: usize,
    pub wrong_season: usize,
    pub duplicates: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accepted, {} malformed, {} other-season, {} duplicate",
            self.accepted, self.malformed, self.wrong_season, self.duplicates
        )
    }
}

/// Validate raw records for `season`.
///
/// Malformed records, records from another season, and repeated
/// (game, team) pairs are dropped with a data-quality warning. Input order
/// is preserved for everything that survives.
pub fn ingest(raw: Vec<RawGameRecord>, season: i32) -> (Vec<GameRecord>, IngestStats) {
    let mut stats = IngestStats::default();
    let mut seen: HashSet<(u64, u32)> = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());

    for row in raw {
        let (game_id, team_id) = (row.game_id, row.team_id);
        if row.season != season {
            warn!(
                "dropping game {game_id} team {team_id}: season {} does not match {season}",
                row.season
            );
            stats.wrong_season += 1;
            continue;
        }
        let record = match GameRecord::try_from(row) {
            Ok(record) => record,
            Err(e) => {
                warn!("dropping malformed record for game {game_id} team {team_id}: {e}");
                stats.malformed += 1;
                continue;
            }
        };
        if !seen.insert((game_id, team_id)) {
            warn!("dropping duplicate record for game {game_id} team {team_id}");
            stats.duplicates += 1;
            continue;
        }
        records.push(record);
    }

    stats.accepted = records.len();
    info!("Ingested season {season}: {stats}");
    (records, stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(game_id: u64, team_id: u32) -> RawGameRecord {
        RawGameRecord {
            season: 2024,
            game_id,
            team_id,
            venue_id: Some(15),
            is_home: true,
            opponent_ra9_minus: 95.0,
            opponent_hand: Some("L".into()),
            runs: 4,
            hits: 8,
            walks: 3,
            strikeouts: 7,
        }
    }

    #[test]
    fn valid_record_converts() {
        let record = GameRecord::try_from(raw(1, 10)).unwrap();
        assert_eq!(record.venue_id, 15);
        assert_eq!(record.opponent_hand, Some(Handedness::Left));
        assert_eq!(
            record.line,
            BattingLine {
                runs: 4,
                hits: 8,
                walks: 3,
                strikeouts: 7
            }
        );
    }

    #[test]
    fn negative_stat_rejected() {
        let mut row = raw(1, 10);
        row.walks = -1;
        assert_eq!(
            GameRecord::try_from(row).unwrap_err(),
            RecordError::NegativeStat {
                field: "walks",
                value: -1
            }
        );
    }

    #[test]
    fn non_positive_ra9_rejected() {
        let mut row = raw(1, 10);
        row.opponent_ra9_minus = 0.0;
        assert!(matches!(
            GameRecord::try_from(row).unwrap_err(),
            RecordError::InvalidRa9Minus(_)
        ));

        let mut row = raw(1, 10);
        row.opponent_ra9_minus = f64::NAN;
        assert!(matches!(
            GameRecord::try_from(row).unwrap_err(),
            RecordError::InvalidRa9Minus(_)
        ));
    }

    #[test]
    fn missing_venue_rejected() {
        let mut row = raw(1, 10);
        row.venue_id = None;
        assert_eq!(GameRecord::try_from(row).unwrap_err(), RecordError::MissingVenue);
    }

    #[test]
    fn unknown_hand_is_not_malformed() {
        let mut row = raw(1, 10);
        row.opponent_hand = Some("Unknown".into());
        let record = GameRecord::try_from(row).unwrap();
        assert_eq!(record.opponent_hand, None);

        let mut row = raw(1, 10);
        row.opponent_hand = None;
        assert_eq!(GameRecord::try_from(row).unwrap().opponent_hand, None);
    }

    #[test]
    fn hand_codes_parse() {
        assert_eq!(Handedness::from_code(" r "), Some(Handedness::Right));
        assert_eq!(Handedness::from_code("LHP"), Some(Handedness::Left));
        assert_eq!(Handedness::from_code("S"), None);
        assert_eq!(Handedness::from_code(""), None);
    }

    #[test]
    fn ingest_drops_bad_rows_and_keeps_order() {
        let mut bad = raw(2, 11);
        bad.runs = -3;
        let mut other_season = raw(3, 12);
        other_season.season = 2023;
        let rows = vec![raw(1, 10), bad, other_season, raw(1, 10), raw(4, 13)];

        let (records, stats) = ingest(rows, 2024);
        assert_eq!(
            stats,
            IngestStats {
                accepted: 2,
                malformed: 1,
                wrong_season: 1,
                duplicates: 1
            }
        );
        let ids: Vec<(u64, u32)> = records.iter().map(|r| (r.game_id, r.team_id)).collect();
        assert_eq!(ids, vec![(1, 10), (4, 13)]);
    }

    #[test]
    fn unknown_team_placeholder() {
        let team = TeamInfo::unknown(147);
        assert_eq!(team.name, "Team 147");
        assert!(team.abbreviation.is_empty());
    }
}
