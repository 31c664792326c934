//! Relevance scoring.
//!
//! Cosine similarity between a unit's embedding and the query embedding.
//!
//! ```text
//!            a · b
//! cos(θ) = ─────────
//!          ‖a‖ × ‖b‖
//! ```
//!
//! A zero-norm vector (embedding of empty text) or a dimension mismatch has
//! no direction to compare, so it gets [`MIN_SCORE`] instead of a division
//! by zero.

/// Lowest possible cosine similarity.
pub const MIN_SCORE: f32 = -1.0;

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; [`MIN_SCORE`] for empty, zero-norm, or
/// mismatched vectors. Symmetric in its arguments.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return MIN_SCORE;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return MIN_SCORE;
    }

    (dot / denom).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = vec![0.3, -1.2, 4.5, 0.0];
        let b = vec![2.0, 0.1, -0.7, 9.9];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn magnitude_does_not_matter() {
        let a = vec![1.0, 2.0];
        let b = vec![10.0, 20.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_minimum() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), MIN_SCORE);
        assert_eq!(cosine_similarity(&v, &zero), MIN_SCORE);
    }

    #[test]
    fn empty_and_mismatched_vectors_score_minimum() {
        assert_eq!(cosine_similarity(&[], &[]), MIN_SCORE);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), MIN_SCORE);
    }
}
