// Opponent run prevention: staff RA9 relative to the league, scaled to 100.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::client::StaffPitching;

/// League RA9 assumed when no staff reported any innings.
pub const FALLBACK_LEAGUE_RA9: f64 = 4.5;

/// RA9- given to a staff with no usable pitching line.
pub const NEUTRAL_RA9_MINUS: f64 = 100.0;

/// Parse innings in baseball notation: the digit after the point counts
/// outs, so "145.1" is 145⅓ innings and "145.2" is 145⅔.
pub fn parse_innings(text: &str) -> Option<f64> {
    let text = text.trim();
    let (whole, outs) = match text.split_once('.') {
        Some((whole, outs)) => (whole, outs),
        None => (text, "0"),
    };
    let whole: u64 = whole.parse().ok()?;
    let outs: u64 = if outs.is_empty() { 0 } else { outs.parse().ok()? };
    if outs > 2 {
        return None;
    }
    Some(whole as f64 + outs as f64 / 3.0)
}

/// Compute RA9- for every team in `staffs`.
///
/// `None` entries are teams whose stats could not be fetched; they and any
/// staff with zero or unreadable innings are neutral.
pub fn ra9_minus_table(staffs: &BTreeMap<u32, Option<StaffPitching>>) -> BTreeMap<u32, f64> {
    let innings: BTreeMap<u32, (u64, f64)> = staffs
        .iter()
        .filter_map(|(&team_id, staff)| {
            let staff = staff.as_ref()?;
            match parse_innings(&staff.innings_text) {
                Some(ip) => Some((team_id, (staff.runs, ip))),
                None => {
                    warn!(
                        "team {}: unreadable innings '{}', treating staff as league average",
                        team_id, staff.innings_text
                    );
                    None
                }
            }
        })
        .collect();

    let total_runs: u64 = innings.values().map(|&(runs, _)| runs).sum();
    let total_ip: f64 = innings.values().map(|&(_, ip)| ip).sum();
    let league_ra9 = if total_ip > 0.0 {
        total_runs as f64 / total_ip * 9.0
    } else {
        FALLBACK_LEAGUE_RA9
    };
    debug!("league RA9 {:.3} over {:.1} innings", league_ra9, total_ip);

    staffs
        .keys()
        .map(|&team_id| {
            let value = match innings.get(&team_id) {
                Some(&(runs, ip)) if ip > 0.0 && league_ra9 > 0.0 => {
                    (runs as f64 / ip * 9.0) / league_ra9 * 100.0
                }
                _ => NEUTRAL_RA9_MINUS,
            };
            (team_id, value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(runs: u64, ip: &str) -> Option<StaffPitching> {
        Some(StaffPitching {
            runs,
            innings_text: ip.into(),
        })
    }

    #[test]
    fn innings_notation() {
        assert_eq!(parse_innings("145"), Some(145.0));
        assert!((parse_innings("145.1").unwrap() - (145.0 + 1.0 / 3.0)).abs() < 1e-12);
        assert!((parse_innings("145.2").unwrap() - (145.0 + 2.0 / 3.0)).abs() < 1e-12);
        assert_eq!(parse_innings(" 9.0 "), Some(9.0));
        assert_eq!(parse_innings("0"), Some(0.0));
        assert_eq!(parse_innings("145.3"), None);
        assert_eq!(parse_innings("abc"), None);
        assert_eq!(parse_innings(""), None);
    }

    #[test]
    fn relative_to_league() {
        // League: 1200 runs over 2700 innings -> RA9 4.0.
        let staffs = BTreeMap::from([(1, staff(480, "1350")), (2, staff(720, "1350"))]);
        let table = ra9_minus_table(&staffs);
        assert!((table[&1] - 80.0).abs() < 1e-9);
        assert!((table[&2] - 120.0).abs() < 1e-9);
    }

    #[test]
    fn missing_or_empty_staff_is_neutral() {
        let staffs = BTreeMap::from([
            (1, staff(400, "900")),
            (2, None),
            (3, staff(0, "0")),
            (4, staff(50, "12.7")),
        ]);
        let table = ra9_minus_table(&staffs);
        assert_eq!(table.len(), 4);
        assert!((table[&1] - 100.0).abs() < 1e-9);
        assert_eq!(table[&2], NEUTRAL_RA9_MINUS);
        assert_eq!(table[&3], NEUTRAL_RA9_MINUS);
        assert_eq!(table[&4], NEUTRAL_RA9_MINUS);
    }

    #[test]
    fn no_innings_anywhere_is_all_neutral() {
        let staffs = BTreeMap::from([(1, staff(0, "0")), (2, None)]);
        let table = ra9_minus_table(&staffs);
        assert!(table.values().all(|&v| v == NEUTRAL_RA9_MINUS));
    }
}
