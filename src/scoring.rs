//! Field scorers: each maps one requirement/candidate value pair to [0,1]

use crate::normalize::canonical;
use crate::types::OrdinalScale;
use std::collections::BTreeSet;

/// Score used when a field cannot be computed
pub const FALLBACK_SCORE: f64 = 0.0;

/// Clamp into [0,1]; NaN becomes 0.0
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Cosine similarity in [-1,1]; zero vectors and mismatched lengths give 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Semantic score from two embeddings. Anti-correlated text scores 0, not below it.
pub fn semantic_score(requirement: &[f32], candidate: &[f32]) -> f64 {
    clamp_unit(cosine_similarity(requirement, candidate) as f64)
}

/// 1.0 on canonical equality. An empty requirement is no constraint.
pub fn exact_score(requirement: &str, candidate: &str) -> f64 {
    let req = canonical(requirement);
    if req.is_empty() {
        return 1.0;
    }
    if req == canonical(candidate) {
        1.0
    } else {
        0.0
    }
}

/// Where a value sits on an ordinal scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelPosition {
    Known(usize),
    /// Empty value, placed at the midpoint
    Missing,
    /// Non-empty but not a level of the scale, placed at the midpoint
    Unrecognized,
}

impl OrdinalScale {
    pub fn locate(&self, value: &str) -> LevelPosition {
        let key = canonical(value);
        if key.is_empty() {
            return LevelPosition::Missing;
        }
        match self.levels().iter().position(|l| *l == key) {
            Some(idx) => LevelPosition::Known(idx),
            None => LevelPosition::Unrecognized,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.len().saturating_sub(1)) as f64 / 2.0
    }

    /// Numeric position; anything not on the scale sits at the midpoint
    pub fn position(&self, value: &str) -> f64 {
        match self.locate(value) {
            LevelPosition::Known(idx) => idx as f64,
            LevelPosition::Missing | LevelPosition::Unrecognized => self.midpoint(),
        }
    }
}

/// `1 - |distance| / (scale_size - 1)`, floored at 0
pub fn ordinal_score(scale: &OrdinalScale, requirement: &str, candidate: &str) -> f64 {
    let span = scale.len().saturating_sub(1);
    if span == 0 {
        return 1.0;
    }
    let distance = (scale.position(requirement) - scale.position(candidate)).abs();
    clamp_unit(1.0 - distance / span as f64)
}

/// Fraction of requirement tokens the candidate covers. No requirement tokens is full score.
pub fn set_overlap_score(requirement: &BTreeSet<String>, candidate: &BTreeSet<String>) -> f64 {
    if requirement.is_empty() {
        return 1.0;
    }
    let hits = requirement.intersection(candidate).count();
    clamp_unit(hits as f64 / requirement.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::token_set;

    fn set(text: &str) -> BTreeSet<String> {
        token_set(text)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_semantic_score_clamps_negative() {
        assert_eq!(semantic_score(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert!((semantic_score(&[1.0, 1.0], &[1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(semantic_score(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_exact_score() {
        assert_eq!(exact_score("Paris", "paris!"), 1.0);
        assert_eq!(exact_score("paris", "berlin"), 0.0);
        assert_eq!(exact_score("paris", ""), 0.0);
        assert_eq!(exact_score("  New   York ", "new york"), 1.0);
    }

    #[test]
    fn test_exact_empty_requirement_is_unconstrained() {
        for cand in ["", "anything", "Berlin", "!!"] {
            assert_eq!(exact_score("", cand), 1.0);
            assert_eq!(exact_score("  ?? ", cand), 1.0);
        }
    }

    #[test]
    fn test_ordinal_identity_and_monotonic() {
        let scale = OrdinalScale::new(["intern", "entry", "mid", "senior", "lead"]).unwrap();
        for level in scale.levels() {
            assert_eq!(ordinal_score(&scale, level, level), 1.0);
        }

        let from_intern: Vec<f64> = scale
            .levels()
            .iter()
            .map(|l| ordinal_score(&scale, "intern", l))
            .collect();
        for pair in from_intern.windows(2) {
            assert!(pair[0] > pair[1], "{:?}", from_intern);
        }
        assert_eq!(*from_intern.last().unwrap(), 0.0);
    }

    #[test]
    fn test_ordinal_unrecognized_maps_to_midpoint() {
        let scale = OrdinalScale::default();
        assert_eq!(scale.locate("Principal"), LevelPosition::Unrecognized);
        assert_eq!(scale.locate(""), LevelPosition::Missing);
        assert_eq!(ordinal_score(&scale, "mid", "principal"), 1.0);
        assert_eq!(ordinal_score(&scale, "senior", ""), 0.5);
        assert_eq!(ordinal_score(&scale, "Senior", "SENIOR"), 1.0);
    }

    #[test]
    fn test_ordinal_single_level_scale() {
        let scale = OrdinalScale::new(["any"]).unwrap();
        assert_eq!(ordinal_score(&scale, "any", "other"), 1.0);
    }

    #[test]
    fn test_set_overlap() {
        assert_eq!(set_overlap_score(&set("cvent"), &set("cvent; pmp")), 1.0);
        assert_eq!(set_overlap_score(&set("cvent; pmp"), &set("pmp")), 0.5);
        assert_eq!(set_overlap_score(&set("cvent"), &set("")), 0.0);
        assert_eq!(set_overlap_score(&set(""), &set("")), 1.0);
        assert_eq!(set_overlap_score(&set(""), &set("pmp")), 1.0);
    }

    #[test]
    fn test_set_overlap_superset_is_full() {
        let req = set("a; b; c");
        let cand = set("c; b; a; d; e");
        assert_eq!(set_overlap_score(&req, &cand), 1.0);
    }

    #[test]
    fn test_all_scorers_stay_in_unit_range() {
        let scale = OrdinalScale::default();
        let texts = ["", "mid", "Senior!", "entry; mid", "x", "???", "paris, berlin"];
        for r in texts {
            for c in texts {
                for s in [
                    exact_score(r, c),
                    ordinal_score(&scale, r, c),
                    set_overlap_score(&set(r), &set(c)),
                ] {
                    assert!((0.0..=1.0).contains(&s), "{} vs {} -> {}", r, c, s);
                }
            }
        }
    }
}
