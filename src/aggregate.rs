//! Weighted aggregation and the deterministic result order

use crate::scoring::clamp_unit;
use crate::types::{CandidateRecord, RankedCandidate, ScoreBreakdown};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Decimal places scores are exposed at
pub const SCORE_PRECISION: i32 = 6;

/// Round to [`SCORE_PRECISION`] decimals so snapshots are reproducible
pub fn round_score(x: f64) -> f64 {
    let factor = 10f64.powi(SCORE_PRECISION);
    (x * factor).round() / factor
}

/// `Σ(score·weight) / Σ(weight)` over the weighted fields.
///
/// Weights are scaled by the largest one first, so any finite weights sum without
/// overflow. A field with no score contributes 0.0. A zero weight sum gives 0.0.
pub fn aggregate(scores: &BTreeMap<String, f64>, weights: &[(&str, f64)]) -> f64 {
    let max_weight = weights.iter().map(|(_, w)| *w).fold(0.0, f64::max);
    if max_weight <= 0.0 || !max_weight.is_finite() {
        return 0.0;
    }

    let mut weight_sum = 0.0;
    let mut weighted = 0.0;
    for (name, w) in weights {
        let scaled = w / max_weight;
        weight_sum += scaled;
        weighted += scores.get(*name).copied().unwrap_or(0.0) * scaled;
    }

    clamp_unit(weighted / weight_sum)
}

/// Total descending, then identifier ascending
pub fn rank_order(a: (&CandidateRecord, &ScoreBreakdown), b: (&CandidateRecord, &ScoreBreakdown)) -> Ordering {
    b.1.total
        .total_cmp(&a.1.total)
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Sort scored candidates and assign 1-based ranks
pub fn rank_entries(mut scored: Vec<(CandidateRecord, ScoreBreakdown)>) -> Vec<RankedCandidate> {
    scored.sort_by(|a, b| rank_order((&a.0, &a.1), (&b.0, &b.1)));

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (candidate, breakdown))| RankedCandidate {
            rank: idx + 1,
            candidate,
            breakdown,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn scored(id: &str, total: f64) -> (CandidateRecord, ScoreBreakdown) {
        (
            CandidateRecord::new(id),
            ScoreBreakdown {
                total,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_aggregate_weighted_mean() {
        let s = scores(&[("skills", 1.0), ("location", 0.0)]);
        let total = aggregate(&s, &[("skills", 3.0), ("location", 1.0)]);
        assert!((total - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_all_ones_is_one() {
        let s = scores(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        for weights in [
            vec![("a", 1.0), ("b", 1.0), ("c", 1.0)],
            vec![("a", 0.3), ("b", 0.0), ("c", 0.05)],
            vec![("a", 100.0), ("b", 2.5), ("c", 0.001)],
        ] {
            assert!((aggregate(&s, &weights) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_aggregate_huge_weights_do_not_overflow() {
        let s = scores(&[("edu", 1.0), ("loc", 1.0)]);
        assert_eq!(aggregate(&s, &[("edu", f64::MAX), ("loc", f64::MAX)]), 1.0);

        let half = scores(&[("edu", 1.0), ("loc", 0.0)]);
        assert_eq!(aggregate(&half, &[("edu", f64::MAX), ("loc", f64::MAX)]), 0.5);
    }

    #[test]
    fn test_aggregate_zero_weights_is_zero() {
        let s = scores(&[("a", 1.0)]);
        assert_eq!(aggregate(&s, &[("a", 0.0)]), 0.0);
        assert_eq!(aggregate(&s, &[]), 0.0);
    }

    #[test]
    fn test_aggregate_missing_score_counts_as_zero() {
        let s = scores(&[("a", 1.0)]);
        assert_eq!(aggregate(&s, &[("a", 1.0), ("b", 1.0)]), 0.5);
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123_456_789), 0.123_457);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn test_rank_entries_tie_break_by_id() {
        let ranked = rank_entries(vec![
            scored("zoe", 0.5),
            scored("amy", 0.5),
            scored("max", 0.9),
            scored("bob", 0.1),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["max", "amy", "zoe", "bob"]);
        let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_rank_entries_independent_of_input_order() {
        let forward = rank_entries(vec![scored("a", 0.2), scored("b", 0.2), scored("c", 0.7)]);
        let reverse = rank_entries(vec![scored("c", 0.7), scored("b", 0.2), scored("a", 0.2)]);
        assert_eq!(forward, reverse);
    }
}
