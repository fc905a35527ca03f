// Linear-weights game score for a single batting line.

use crate::config::ScoreWeights;
use crate::records::BattingLine;

/// `runs·w_r + hits·w_h + walks·w_w + strikeouts·w_k`.
///
/// With the default weights this is `R + 0.5·H + 0.7·W − 0.25·K`. The result
/// can be negative: a scoreless game with many strikeouts.
pub fn game_score(line: &BattingLine, weights: &ScoreWeights) -> f64 {
    weights.runs * f64::from(line.runs)
        + weights.hits * f64::from(line.hits)
        + weights.walks * f64::from(line.walks)
        + weights.strikeouts * f64::from(line.strikeouts)
}
