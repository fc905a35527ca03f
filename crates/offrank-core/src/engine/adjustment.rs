// Opponent pitching-quality adjustment factor.
//
// RA9- is league-normalized (100 = average, lower = better pitching). The
// factor shrinks the distance from 100 by the smoothing factor, converts it
// to a multiplier and clamps it. Scores are later divided by this factor, so
// runs against good pitching (factor < 1) count for more.

use crate::config::ClampBounds;

/// League-average RA9-.
pub const LEAGUE_AVERAGE_RA9_MINUS: f64 = 100.0;

/// Compute the clamped adjustment factor for an opponent's RA9-.
///
/// ```text
/// deviation = ra9_minus - 100
/// factor    = clamp((100 + deviation * (1 - smoothing)) / 100, lo, hi)
/// ```
///
/// The clamp is applied after smoothing at every smoothing level, including
/// zero. Monotonic non-decreasing in `ra9_minus`; exactly 1.0 when
/// `ra9_minus == 100` or `smoothing == 1`.
pub fn adjustment_factor(ra9_minus: f64, smoothing: f64, bounds: ClampBounds) -> f64 {
    let deviation = ra9_minus - LEAGUE_AVERAGE_RA9_MINUS;
    let smoothed = LEAGUE_AVERAGE_RA9_MINUS + deviation * (1.0 - smoothing);
    bounds.apply(smoothed / LEAGUE_AVERAGE_RA9_MINUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMOOTHING_LEVELS: &[f64] = &[0.0, 0.1, 0.3, 0.5, 0.75, 1.0];

    fn factor(ra9_minus: f64, smoothing: f64) -> f64 {
        adjustment_factor(ra9_minus, smoothing, ClampBounds::default())
    }

    #[test]
    fn elite_opponent_default_smoothing() {
        assert!((factor(70.0, 0.3) - 0.79).abs() < 1e-12);
    }

    #[test]
    fn weak_opponent_default_smoothing() {
        assert!((factor(130.0, 0.3) - 1.21).abs() < 1e-12);
    }

    #[test]
    fn league_average_is_neutral_for_every_smoothing() {
        for &alpha in SMOOTHING_LEVELS {
            assert_eq!(factor(100.0, alpha), 1.0, "alpha={alpha}");
        }
    }

    #[test]
    fn full_smoothing_is_always_neutral() {
        for ra9 in [1.0, 40.0, 85.5, 100.0, 160.0, 400.0] {
            assert_eq!(factor(ra9, 1.0), 1.0, "ra9-={ra9}");
        }
    }

    #[test]
    fn output_stays_within_bounds() {
        for &alpha in SMOOTHING_LEVELS {
            let mut ra9 = 0.5;
            while ra9 < 1000.0 {
                let f = factor(ra9, alpha);
                assert!((0.5..=1.5).contains(&f), "ra9-={ra9} alpha={alpha} factor={f}");
                ra9 *= 1.37;
            }
        }
    }

    #[test]
    fn monotonic_in_ra9_minus() {
        for &alpha in SMOOTHING_LEVELS {
            let mut prev = factor(1.0, alpha);
            for step in 1..400 {
                let current = factor(1.0 + step as f64 * 0.75, alpha);
                assert!(current >= prev, "alpha={alpha} step={step}");
                prev = current;
            }
        }
    }

    #[test]
    fn unsmoothed_is_still_clamped() {
        assert_eq!(factor(30.0, 0.0), 0.5);
        assert_eq!(factor(190.0, 0.0), 1.5);
        assert!((factor(80.0, 0.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn custom_bounds_apply() {
        let bounds = ClampBounds { lo: 0.9, hi: 1.1 };
        assert_eq!(adjustment_factor(70.0, 0.3, bounds), 0.9);
        assert_eq!(adjustment_factor(130.0, 0.3, bounds), 1.1);
    }
}
