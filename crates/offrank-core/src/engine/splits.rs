// Per-team split aggregation.
//
// Each adjusted game feeds the overall split, at most one handedness split
// (none when the opposing starter's hand is unknown), and exactly one of
// home/away. Overall and handedness splits average the park-adjusted score;
// home and away average the park-free score.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::engine::adjuster::AdjustedGameValue;
use crate::records::Handedness;

// ---------------------------------------------------------------------------
// Split keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SplitKey {
    Overall,
    VsLhp,
    VsRhp,
    Home,
    Away,
}

impl SplitKey {
    pub const ALL: [SplitKey; 5] = [
        SplitKey::Overall,
        SplitKey::VsLhp,
        SplitKey::VsRhp,
        SplitKey::Home,
        SplitKey::Away,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SplitKey::Overall => "overall",
            SplitKey::VsLhp => "vs_lhp",
            SplitKey::VsRhp => "vs_rhp",
            SplitKey::Home => "home",
            SplitKey::Away => "away",
        }
    }
}

impl fmt::Display for SplitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Running sum and count of adjusted scores for one (team, split) group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SplitStat {
    pub games: u32,
    pub total_adjusted: f64,
}

impl SplitStat {
    fn add(&mut self, score: f64) {
        self.games += 1;
        self.total_adjusted += score;
    }

    /// Mean adjusted score, or `None` for an empty group.
    pub fn mean(&self) -> Option<f64> {
        (self.games > 0).then(|| self.total_adjusted / f64::from(self.games))
    }
}

/// Raw counting totals over every game a team played. Reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawTotals {
    pub runs: u64,
    pub hits: u64,
    pub walks: u64,
    pub strikeouts: u64,
    pub total_game_score: f64,
}

/// All split aggregates for one team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamSplitAggregate {
    pub team_id: u32,
    pub overall: SplitStat,
    pub vs_lhp: SplitStat,
    pub vs_rhp: SplitStat,
    pub home: SplitStat,
    pub away: SplitStat,
    pub totals: RawTotals,
}

impl TeamSplitAggregate {
    fn new(team_id: u32) -> Self {
        TeamSplitAggregate {
            team_id,
            ..Self::default()
        }
    }

    fn add(&mut self, game: &AdjustedGameValue) {
        self.overall.add(game.adjusted_score);
        match game.opponent_hand {
            Some(Handedness::Left) => self.vs_lhp.add(game.adjusted_score),
            Some(Handedness::Right) => self.vs_rhp.add(game.adjusted_score),
            None => {}
        }
        if game.is_home {
            self.home.add(game.adjusted_score_no_park);
        } else {
            self.away.add(game.adjusted_score_no_park);
        }

        self.totals.runs += u64::from(game.line.runs);
        self.totals.hits += u64::from(game.line.hits);
        self.totals.walks += u64::from(game.line.walks);
        self.totals.strikeouts += u64::from(game.line.strikeouts);
        self.totals.total_game_score += game.game_score;
    }

    pub fn split(&self, key: SplitKey) -> &SplitStat {
        match key {
            SplitKey::Overall => &self.overall,
            SplitKey::VsLhp => &self.vs_lhp,
            SplitKey::VsRhp => &self.vs_rhp,
            SplitKey::Home => &self.home,
            SplitKey::Away => &self.away,
        }
    }

    pub fn games_played(&self) -> u32 {
        self.overall.games
    }

    /// Mean unadjusted game score across all games.
    pub fn avg_game_score(&self) -> f64 {
        per_game(self.totals.total_game_score, self.games_played())
    }

    pub fn avg_runs(&self) -> f64 {
        per_game(self.totals.runs as f64, self.games_played())
    }
}

fn per_game(total: f64, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    total / f64::from(games)
}

/// Split aggregates for every team with at least one game, keyed by team id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitAggregates {
    teams: BTreeMap<u32, TeamSplitAggregate>,
}

/// One team's entry in a single split, ready for ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitGroup {
    pub team_id: u32,
    pub games: u32,
    pub mean_adjusted: f64,
}

impl SplitAggregates {
    /// Group adjusted games by team and split.
    pub fn build(games: &[AdjustedGameValue]) -> Self {
        let mut teams: BTreeMap<u32, TeamSplitAggregate> = BTreeMap::new();
        for game in games {
            teams
                .entry(game.team_id)
                .or_insert_with(|| TeamSplitAggregate::new(game.team_id))
                .add(game);
        }
        SplitAggregates { teams }
    }

    pub fn team(&self, team_id: u32) -> Option<&TeamSplitAggregate> {
        self.teams.get(&team_id)
    }

    /// Teams in ascending id order.
    pub fn teams(&self) -> impl Iterator<Item = &TeamSplitAggregate> {
        self.teams.values()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Every team with at least one game in `key`, in ascending id order.
    /// Teams with no games in the split are left out rather than scored 0.
    pub fn groups(&self, key: SplitKey) -> Vec<SplitGroup> {
        self.teams
            .values()
            .filter_map(|team| {
                let stat = team.split(key);
                stat.mean().map(|mean_adjusted| SplitGroup {
                    team_id: team.team_id,
                    games: stat.games,
                    mean_adjusted,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
