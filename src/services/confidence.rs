//! Retrieval confidence scoring.

/// Derive a confidence value in `[0, 1]` from retrieval scores: the mean
/// score linearly scaled by `boost`, then clamped.
///
/// This is a heuristic, not a calibrated probability; it only says how
/// strongly the retrieved passages matched, nothing about answer quality.
/// Empty retrieval yields 0.0.
pub fn confidence_score(scores: &[f32], boost: f32) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    (mean * boost).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yields_zero() {
        assert_eq!(confidence_score(&[], 1.2), 0.0);
    }

    #[test]
    fn test_mean_is_boosted() {
        let c = confidence_score(&[0.4, 0.6], 1.2);
        assert!((c - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_clamped_to_one() {
        assert_eq!(confidence_score(&[0.9, 0.95], 1.2), 1.0);
    }

    #[test]
    fn test_negative_scores_clamp_to_zero() {
        assert_eq!(confidence_score(&[-0.5, -0.1], 1.2), 0.0);
    }

    #[test]
    fn test_always_in_unit_interval() {
        for scores in [vec![0.0], vec![1.0, 1.0], vec![-1.0, 2.0], vec![0.31]] {
            let c = confidence_score(&scores, 1.2);
            assert!((0.0..=1.0).contains(&c), "confidence {c} out of range");
        }
    }
}
