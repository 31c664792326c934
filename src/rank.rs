//! Importance ranking.
//!
//! Sort: score desc, then extraction order asc (document, page, in-page
//! index). Keep the first `top_k` and number them 1..=K. There is no score
//! cutoff; only the count limits the result.

use std::cmp::Ordering;

use crate::models::{CandidateSection, ScoredSection};

/// Descending score order. NaN sorts after every real score.
pub(crate) fn by_score_desc(a: f32, b: f32) -> Ordering {
    let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
    key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal)
}

/// Rank scored candidates and keep the best `top_k`.
///
/// Returns `min(top_k, scored.len())` sections with ranks exactly `1..=K`.
pub fn rank_sections(scored: Vec<(CandidateSection, f32)>, top_k: usize) -> Vec<ScoredSection> {
    let mut scored = scored;
    scored.sort_by(|(sa, a), (sb, b)| by_score_desc(*a, *b).then(sa.order.cmp(&sb.order)));

    scored
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, (section, score))| ScoredSection {
            section,
            score,
            rank: i as u32 + 1,
        })
        .collect()
}
