// Ranking table assembly, CSV export and console rendering.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::engine::park::ParkFactorTable;
use crate::engine::ranking::Rankings;
use crate::engine::splits::{SplitAggregates, SplitKey, TeamSplitAggregate};
use crate::records::TeamInfo;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One team's line in the exported table. Field order is the CSV column
/// order. A split the team has no games in shows rank 0, average 0, games 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    #[serde(skip)]
    pub team_id: u32,
    pub rank: u32,
    pub team_name: String,
    pub abbreviation: String,
    pub games_played: u32,
    pub avg_adjusted_score: f64,
    pub rank_vs_lhp: u32,
    pub avg_adj_vs_lhp: f64,
    pub games_vs_lhp: u32,
    pub rank_vs_rhp: u32,
    pub avg_adj_vs_rhp: f64,
    pub games_vs_rhp: u32,
    pub rank_home: u32,
    pub avg_adj_home: f64,
    pub games_home: u32,
    pub rank_away: u32,
    pub avg_adj_away: f64,
    pub games_away: u32,
    pub avg_game_score: f64,
    pub avg_runs: f64,
    pub total_runs: u64,
    pub total_hits: u64,
    pub total_walks: u64,
    pub total_strikeouts: u64,
}

/// Final output: one row per team, ordered by overall rank then team id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingTable {
    pub rows: Vec<RankingRow>,
}

impl RankingTable {
    pub fn build(aggregates: &SplitAggregates, rankings: &Rankings, teams: &[TeamInfo]) -> Self {
        let info: HashMap<u32, &TeamInfo> = teams.iter().map(|t| (t.id, t)).collect();

        // Rankings are already in (rank, team id) order for the overall split.
        let rows = rankings
            .split(SplitKey::Overall)
            .iter()
            .filter_map(|entry| aggregates.team(entry.team_id))
            .map(|team| build_row(team, rankings, info.get(&team.team_id).copied()))
            .collect();

        RankingTable { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn build_row(team: &TeamSplitAggregate, rankings: &Rankings, info: Option<&TeamInfo>) -> RankingRow {
    let split = |key: SplitKey| -> (u32, f64, u32) {
        rankings
            .entry(key, team.team_id)
            .map_or((0, 0.0, 0), |e| (e.rank, e.mean_adjusted, e.games))
    };
    let (rank, avg_adjusted_score, games_played) = split(SplitKey::Overall);
    let (rank_vs_lhp, avg_adj_vs_lhp, games_vs_lhp) = split(SplitKey::VsLhp);
    let (rank_vs_rhp, avg_adj_vs_rhp, games_vs_rhp) = split(SplitKey::VsRhp);
    let (rank_home, avg_adj_home, games_home) = split(SplitKey::Home);
    let (rank_away, avg_adj_away, games_away) = split(SplitKey::Away);

    let fallback;
    let info = match info {
        Some(info) => info,
        None => {
            fallback = TeamInfo::unknown(team.team_id);
            &fallback
        }
    };

    RankingRow {
        team_id: team.team_id,
        rank,
        team_name: info.name.clone(),
        abbreviation: info.abbreviation.clone(),
        games_played,
        avg_adjusted_score,
        rank_vs_lhp,
        avg_adj_vs_lhp,
        games_vs_lhp,
        rank_vs_rhp,
        avg_adj_vs_rhp,
        games_vs_rhp,
        rank_home,
        avg_adj_home,
        games_home,
        rank_away,
        avg_adj_away,
        games_away,
        avg_game_score: team.avg_game_score(),
        avg_runs: team.avg_runs(),
        total_runs: team.totals.runs,
        total_hits: team.totals.hits,
        total_walks: team.totals.walks,
        total_strikeouts: team.totals.strikeouts,
    }
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Write the table as CSV with a header row.
pub fn write_csv<W: Write>(table: &RankingTable, writer: W) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &table.rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| ReportError::Io {
        path: "<writer>".into(),
        source: e,
    })?;
    Ok(())
}

/// `offense_rankings_<season>_<YYYYmmdd_HHMMSS>.csv`
pub fn results_file_name(season: i32, timestamp: NaiveDateTime) -> String {
    format!(
        "offense_rankings_{season}_{}.csv",
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Write the table into `dir` (created if missing) and return the file path.
pub fn save_results(
    table: &RankingTable,
    dir: &Path,
    season: i32,
    timestamp: NaiveDateTime,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    let path = dir.join(results_file_name(season, timestamp));
    let file = std::fs::File::create(&path).map_err(|e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_csv(table, file)?;
    info!("Results saved to {}", path.display());
    Ok(path)
}

// ---------------------------------------------------------------------------
// Console rendering
// ---------------------------------------------------------------------------

const COLUMNS: &[(&str, usize)] = &[
    ("rank", 4),
    ("team_name", 24),
    ("abbr", 4),
    ("G", 4),
    ("adj", 7),
    ("rk_lhp", 6),
    ("adj_lhp", 7),
    ("g_lhp", 5),
    ("rk_rhp", 6),
    ("adj_rhp", 7),
    ("g_rhp", 5),
    ("rk_hm", 5),
    ("adj_hm", 7),
    ("g_hm", 4),
    ("rk_aw", 5),
    ("adj_aw", 7),
    ("g_aw", 4),
    ("gscore", 7),
    ("r/g", 5),
    ("R", 5),
    ("H", 5),
    ("BB", 5),
    ("K", 5),
];

/// Fixed-width table with two-decimal floats.
pub fn render_table(table: &RankingTable) -> String {
    let mut out = String::new();
    let header: Vec<String> = COLUMNS
        .iter()
        .map(|&(name, width)| format!("{name:>width$}"))
        .collect();
    let _ = writeln!(out, "{}", header.join(" "));

    for row in &table.rows {
        let cells = [
            row.rank.to_string(),
            truncate(&row.team_name, 24),
            row.abbreviation.clone(),
            row.games_played.to_string(),
            format!("{:.2}", row.avg_adjusted_score),
            row.rank_vs_lhp.to_string(),
            format!("{:.2}", row.avg_adj_vs_lhp),
            row.games_vs_lhp.to_string(),
            row.rank_vs_rhp.to_string(),
            format!("{:.2}", row.avg_adj_vs_rhp),
            row.games_vs_rhp.to_string(),
            row.rank_home.to_string(),
            format!("{:.2}", row.avg_adj_home),
            row.games_home.to_string(),
            row.rank_away.to_string(),
            format!("{:.2}", row.avg_adj_away),
            row.games_away.to_string(),
            format!("{:.2}", row.avg_game_score),
            format!("{:.2}", row.avg_runs),
            row.total_runs.to_string(),
            row.total_hits.to_string(),
            row.total_walks.to_string(),
            row.total_strikeouts.to_string(),
        ];
        let line: Vec<String> = cells
            .iter()
            .zip(COLUMNS)
            .map(|(cell, &(_, width))| format!("{cell:>width$}"))
            .collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// League scoring environment plus the most hitter- and pitcher-friendly
/// parks.
pub fn render_park_summary(parks: &ParkFactorTable, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "League average runs per game: {:.3} ({} games, {} venues)",
        parks.league_runs_per_game(),
        parks.league_games(),
        parks.venues().count()
    );

    let ranked = parks.ranked_venues();
    let _ = writeln!(out, "Top {top} hitter-friendly parks:");
    for venue in ranked.iter().take(top) {
        let _ = writeln!(
            out,
            "  Venue {}: {:.3} ({} games)",
            venue.venue_id, venue.park_factor, venue.games
        );
    }
    let _ = writeln!(out, "Top {top} pitcher-friendly parks:");
    for venue in ranked.iter().rev().take(top) {
        let _ = writeln!(
            out,
            "  Venue {}: {:.3} ({} games)",
            venue.venue_id, venue.park_factor, venue.games
        );
    }
    out
}

/// Short legend explaining the metric and the splits.
pub fn render_legend(smoothing: f64) -> String {
    format!(
        "Game score = R + 0.5*H + 0.7*BB - 0.25*K\n\
         Adjusted score = game score / (opponent factor * park factor), smoothing {smoothing:.2}\n\
         Handedness splits include park factors; home/away splits exclude them.\n\
         Rank 0 means the team has no games in that split.\n"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::adjuster::AdjustedGameValue;
    use crate::records::{BattingLine, Handedness};

    fn game(team_id: u32, hand: Option<Handedness>, is_home: bool, adjusted: f64) -> AdjustedGameValue {
        AdjustedGameValue {
            game_id: 0,
            team_id,
            opponent_hand: hand,
            is_home,
            line: BattingLine {
                runs: 5,
                hits: 9,
                walks: 4,
                strikeouts: 8,
            },
            game_score: 7.3,
            adjustment_factor: 1.0,
            park_factor: 1.0,
            adjusted_score: adjusted,
            adjusted_score_no_park: adjusted,
        }
    }

    fn sample_table() -> RankingTable {
        let games = vec![
            game(1, Some(Handedness::Right), true, 5.0),
            game(2, Some(Handedness::Left), true, 8.0),
            game(2, Some(Handedness::Right), false, 6.0),
            game(3, None, false, 7.0),
        ];
        let aggregates = SplitAggregates::build(&games);
        let rankings = Rankings::build(&aggregates, 2);
        let teams = vec![
            TeamInfo {
                id: 1,
                name: "Boston Red Sox".into(),
                abbreviation: "BOS".into(),
                division: "AL East".into(),
            },
            TeamInfo {
                id: 2,
                name: "Chicago Cubs".into(),
                abbreviation: "CHC".into(),
                division: "NL Central".into(),
            },
        ];
        RankingTable::build(&aggregates, &rankings, &teams)
    }

    #[test]
    fn rows_in_overall_rank_order() {
        let table = sample_table();
        let order: Vec<(u32, u32)> = table.rows.iter().map(|r| (r.team_id, r.rank)).collect();
        // Team 2 averages 7.0 and ties team 3; team id breaks the tie.
        assert_eq!(order, vec![(2, 1), (3, 1), (1, 2)]);
    }

    #[test]
    fn missing_split_renders_as_zero() {
        let table = sample_table();
        let team1 = table.rows.iter().find(|r| r.team_id == 1).unwrap();
        assert_eq!(team1.rank_vs_lhp, 0);
        assert_eq!(team1.games_vs_lhp, 0);
        assert_eq!(team1.avg_adj_vs_lhp, 0.0);
        assert_eq!(team1.rank_away, 0);
        assert_eq!(team1.rank_home, 2);
        assert_eq!(team1.rank_vs_rhp, 2);
    }

    #[test]
    fn unknown_team_gets_placeholder_name() {
        let table = sample_table();
        let team3 = table.rows.iter().find(|r| r.team_id == 3).unwrap();
        assert_eq!(team3.team_name, "Team 3");
        assert_eq!(team3.abbreviation, "");
    }

    #[test]
    fn raw_totals_in_row() {
        let table = sample_table();
        let team2 = table.rows.iter().find(|r| r.team_id == 2).unwrap();
        assert_eq!(team2.games_played, 2);
        assert_eq!(team2.total_runs, 10);
        assert_eq!(team2.total_hits, 18);
        assert_eq!(team2.total_walks, 8);
        assert_eq!(team2.total_strikeouts, 16);
        assert!((team2.avg_runs - 5.0).abs() < 1e-12);
        assert!((team2.avg_game_score - 7.3).abs() < 1e-12);
    }

    #[test]
    fn csv_header_matches_output_columns() {
        let mut buf = Vec::new();
        write_csv(&sample_table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "rank,team_name,abbreviation,games_played,avg_adjusted_score,\
rank_vs_lhp,avg_adj_vs_lhp,games_vs_lhp,rank_vs_rhp,avg_adj_vs_rhp,games_vs_rhp,\
rank_home,avg_adj_home,games_home,rank_away,avg_adj_away,games_away,\
avg_game_score,avg_runs,total_runs,total_hits,total_walks,total_strikeouts"
        );
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().nth(1).unwrap().starts_with("1,Chicago Cubs,CHC,2,7"));
    }

    #[test]
    fn results_file_name_format() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(9, 5, 30)
            .unwrap();
        assert_eq!(
            results_file_name(2024, ts),
            "offense_rankings_2024_20240704_090530.csv"
        );
    }

    #[test]
    fn save_results_creates_directory() {
        let dir = std::env::temp_dir().join("offrank_report_test_save/nested");
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let path = save_results(&sample_table(), &dir, 2024, ts).unwrap();
        assert!(path.exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);

        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn rendered_table_has_header_and_rows() {
        let rendered = render_table(&sample_table());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("team_name"));
        assert!(lines[1].contains("Chicago Cubs"));
        assert!(lines[1].contains("7.00"));
    }
}
