// Split rankings.
//
// Each split is ranked on its own. Teams are ordered by mean adjusted score
// rounded to the configured precision (descending), then by team id
// (ascending). Ranks are dense: teams with equal rounded means share a rank
// and the next distinct mean takes the next integer, so every split's ranks
// run 1..=k with no gaps.

use std::collections::BTreeMap;

use crate::engine::splits::{SplitAggregates, SplitGroup, SplitKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingEntry {
    pub team_id: u32,
    pub split: SplitKey,
    /// 1 = best.
    pub rank: u32,
    pub mean_adjusted: f64,
    pub games: u32,
}

/// Comparison key for ties: the mean scaled to an integer number of
/// `10^-precision` units.
fn tie_key(mean: f64, precision: u32) -> i64 {
    let scale = 10f64.powi(precision as i32);
    (mean * scale).round() as i64
}

/// Rank one split's groups.
pub fn rank_split(split: SplitKey, groups: &[SplitGroup], precision: u32) -> Vec<RankingEntry> {
    let mut keyed: Vec<(i64, &SplitGroup)> = groups
        .iter()
        .map(|g| (tie_key(g.mean_adjusted, precision), g))
        .collect();
    keyed.sort_by(|(ka, a), (kb, b)| kb.cmp(ka).then(a.team_id.cmp(&b.team_id)));

    let mut entries = Vec::with_capacity(keyed.len());
    let mut rank = 0u32;
    let mut previous: Option<i64> = None;
    for (key, group) in keyed {
        if previous != Some(key) {
            rank += 1;
            previous = Some(key);
        }
        entries.push(RankingEntry {
            team_id: group.team_id,
            split,
            rank,
            mean_adjusted: group.mean_adjusted,
            games: group.games,
        });
    }
    entries
}

/// Rankings for every split, each in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rankings {
    by_split: BTreeMap<SplitKey, Vec<RankingEntry>>,
}

impl Rankings {
    /// Rank every split. Consumes finished aggregates only, so ranking
    /// always sees complete groups.
    pub fn build(aggregates: &SplitAggregates, precision: u32) -> Self {
        let by_split = SplitKey::ALL
            .iter()
            .map(|&key| (key, rank_split(key, &aggregates.groups(key), precision)))
            .collect();
        Rankings { by_split }
    }

    pub fn split(&self, key: SplitKey) -> &[RankingEntry] {
        self.by_split.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A team's entry in one split, if it played any games in it.
    pub fn entry(&self, key: SplitKey, team_id: u32) -> Option<&RankingEntry> {
        self.split(key).iter().find(|e| e.team_id == team_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn group(team_id: u32, mean_adjusted: f64) -> SplitGroup {
        SplitGroup {
            team_id,
            games: 10,
            mean_adjusted,
        }
    }

    fn ranks(entries: &[RankingEntry]) -> Vec<(u32, u32)> {
        entries.iter().map(|e| (e.team_id, e.rank)).collect()
    }

    #[test]
    fn sorted_descending_by_mean() {
        let groups = vec![group(1, 5.5), group(2, 7.25), group(3, 6.0)];
        let entries = rank_split(SplitKey::Overall, &groups, 2);
        assert_eq!(ranks(&entries), vec![(2, 1), (3, 2), (1, 3)]);
    }

    #[test]
    fn ties_share_rank_and_order_by_team_id() {
        let groups = vec![group(30, 6.0), group(12, 6.0), group(7, 8.0), group(4, 5.0)];
        let entries = rank_split(SplitKey::Home, &groups, 2);
        assert_eq!(ranks(&entries), vec![(7, 1), (12, 2), (30, 2), (4, 3)]);
    }

    #[test]
    fn tie_uses_rounded_precision() {
        // 6.001 and 5.999 both round to 6.00.
        let groups = vec![group(2, 5.999), group(1, 6.001), group(3, 5.994)];
        let entries = rank_split(SplitKey::Away, &groups, 2);
        assert_eq!(ranks(&entries), vec![(1, 1), (2, 1), (3, 2)]);

        // At three decimals they separate.
        let entries = rank_split(SplitKey::Away, &groups, 3);
        assert_eq!(ranks(&entries), vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn negative_means_rank_last() {
        let groups = vec![group(1, -0.75), group(2, 0.0), group(3, 1.0)];
        let entries = rank_split(SplitKey::Overall, &groups, 2);
        assert_eq!(ranks(&entries), vec![(3, 1), (2, 2), (1, 3)]);
    }

    #[test]
    fn ranks_are_contiguous_and_match_distinct_values() {
        let means = [4.1, 3.3, 4.1, 5.0, 2.2, 3.3, 3.3, 6.7, 1.0, 5.0];
        let groups: Vec<SplitGroup> = means
            .iter()
            .enumerate()
            .map(|(i, &m)| group(i as u32 + 1, m))
            .collect();
        let entries = rank_split(SplitKey::VsRhp, &groups, 2);

        let distinct_ranks: BTreeSet<u32> = entries.iter().map(|e| e.rank).collect();
        let distinct_values: BTreeSet<i64> = means.iter().map(|&m| tie_key(m, 2)).collect();
        assert_eq!(distinct_ranks.len(), distinct_values.len());
        let expected: BTreeSet<u32> = (1..=distinct_values.len() as u32).collect();
        assert_eq!(distinct_ranks, expected);

        // Non-decreasing in output order.
        assert!(entries.windows(2).all(|w| w[0].rank <= w[1].rank));
    }

    #[test]
    fn empty_split_has_no_entries() {
        assert!(rank_split(SplitKey::VsLhp, &[], 2).is_empty());
    }

    #[test]
    fn entries_carry_split_and_games() {
        let entries = rank_split(SplitKey::VsLhp, &[group(9, 3.0)], 2);
        assert_eq!(entries[0].split, SplitKey::VsLhp);
        assert_eq!(entries[0].games, 10);
        assert!((entries[0].mean_adjusted - 3.0).abs() < f64::EPSILON);
    }
}
