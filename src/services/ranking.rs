use std::cmp::Ordering;

use crate::models::ScoredCandidate;

/// Upper bound of the normalized score scale
pub const SCORE_SCALE: f64 = 10.0;

/// Span used when every raw score is identical
const DEGENERATE_SPAN: f64 = 0.1;

/// Rescales raw scores to [0, 10] and keeps the best `top_n`
///
/// The minimum maps to 0.0. When all raw scores are equal the span is taken
/// as 0.1, so every entry normalizes to 0.0. Sorting is stable, so equal
/// scores keep their pool order.
pub fn normalize(mut scored: Vec<ScoredCandidate>, top_n: usize) -> Vec<ScoredCandidate> {
    if scored.is_empty() {
        return scored;
    }

    let (min, max) = scored
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.raw_score), hi.max(s.raw_score))
        });
    let span = if max > min { max - min } else { DEGENERATE_SPAN };

    for entry in scored.iter_mut() {
        let normalized = (entry.raw_score - min) / span * SCORE_SCALE;
        entry.normalized_score = normalized.clamp(0.0, SCORE_SCALE);
    }

    scored.sort_by(|a, b| {
        b.normalized_score
            .partial_cmp(&a.normalized_score)
            .unwrap_or(Ordering::Equal)
    });
    scored.truncate(top_n);

    scored
}
