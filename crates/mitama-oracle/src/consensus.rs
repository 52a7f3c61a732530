//! Consensus math - pure functions over oracle scores
//!
//! Two aggregation modes:
//! - median with outlier rejection (equal-trust oracles)
//! - weighted average (differential-trust oracles, no outlier rejection)
//!
//! Both are deterministic: the same submission multiset always produces the
//! same consensus score.

use mitama_types::{MitamaError, Result};

/// Map a quality score to its refund percentage
///
/// Fixed sliding scale, exact boundaries:
///
/// | score  | refund | payment |
/// |--------|--------|---------|
/// | 0-49   | 100    | 0       |
/// | 50-64  | 75     | 25      |
/// | 65-79  | 35     | 65      |
/// | 80-100 | 0      | 100     |
pub fn refund_percentage(quality_score: u8) -> u8 {
    match quality_score {
        0..=49 => 100,
        50..=64 => 75,
        65..=79 => 35,
        _ => 0,
    }
}

/// Median-with-outlier-rejection consensus
///
/// Requires at least `min_consensus` submissions, rejects scores further
/// than `max_deviation` from the median, and requires `min_consensus`
/// survivors. The consensus score is the element at index `len / 2` of the
/// sorted valid list; for an even-sized valid set this deterministically
/// picks the upper-middle value.
pub fn median_filtered(scores: &[u8], min_consensus: u8, max_deviation: u8) -> Result<u8> {
    if scores.len() < min_consensus as usize {
        return Err(MitamaError::InsufficientConsensus {
            submissions: scores.len(),
            required: min_consensus,
        });
    }

    let mut sorted = scores.to_vec();
    sorted.sort_unstable();

    // Integer mean of the two middle values when the count is even.
    let median = if sorted.len() % 2 == 0 {
        let lo = sorted[sorted.len() / 2 - 1] as u16;
        let hi = sorted[sorted.len() / 2] as u16;
        ((lo + hi) / 2) as u8
    } else {
        sorted[sorted.len() / 2]
    };

    let valid: Vec<u8> = sorted
        .iter()
        .copied()
        .filter(|&score| score.abs_diff(median) <= max_deviation)
        .collect();

    if valid.len() < min_consensus as usize {
        return Err(MitamaError::NoConsensus {
            valid: valid.len(),
            submissions: scores.len(),
        });
    }

    Ok(valid[valid.len() / 2])
}

/// Weighted-average consensus: `round(sum(score * weight) / sum(weight))`
///
/// No outlier rejection. Rounds half up.
pub fn weighted(submissions: &[(u8, u16)]) -> Result<u8> {
    if submissions.is_empty() {
        return Err(MitamaError::NoSubmissions);
    }

    let mut sum: u64 = 0;
    let mut total_weight: u64 = 0;
    for &(score, weight) in submissions {
        sum += score as u64 * weight as u64;
        total_weight += weight as u64;
    }
    if total_weight == 0 {
        return Err(MitamaError::NoSubmissions);
    }

    Ok(((sum + total_weight / 2) / total_weight) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_table_boundaries() {
        assert_eq!(refund_percentage(0), 100);
        assert_eq!(refund_percentage(49), 100);
        assert_eq!(refund_percentage(50), 75);
        assert_eq!(refund_percentage(64), 75);
        assert_eq!(refund_percentage(65), 35);
        assert_eq!(refund_percentage(79), 35);
        assert_eq!(refund_percentage(80), 0);
        assert_eq!(refund_percentage(100), 0);
    }

    #[test]
    fn test_refund_monotonic_non_increasing() {
        let mut prev = refund_percentage(0);
        for score in 1..=100u8 {
            let current = refund_percentage(score);
            assert!(current <= prev, "refund increased at score {}", score);
            prev = current;
        }
    }

    #[test]
    fn test_median_outlier_rejection() {
        // Sorted [10, 90, 92]: median 90, 10 is rejected, consensus is the
        // upper-middle of [90, 92].
        assert_eq!(median_filtered(&[90, 92, 10], 2, 15).unwrap(), 92);
    }

    #[test]
    fn test_median_three_way_agreement() {
        // [20, 85, 88]: median 85, 20 rejected, consensus 88.
        assert_eq!(median_filtered(&[85, 88, 20], 2, 15).unwrap(), 88);
    }

    #[test]
    fn test_even_count_median_and_tiebreak() {
        // Sorted [10, 80, 86, 90]: median (80+86)/2 = 83; 10 rejected;
        // valid [80, 86, 90], consensus index 1 -> 86.
        assert_eq!(median_filtered(&[86, 10, 90, 80], 2, 15).unwrap(), 86);
        // Even-sized valid set: [70, 80] -> upper-middle 80.
        assert_eq!(median_filtered(&[70, 80], 2, 15).unwrap(), 80);
        // Submission order does not matter.
        assert_eq!(median_filtered(&[92, 90], 2, 15).unwrap(), 92);
    }

    #[test]
    fn test_insufficient_submissions() {
        let err = median_filtered(&[50], 2, 15).unwrap_err();
        assert!(matches!(err, MitamaError::InsufficientConsensus { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_no_consensus_too_many_outliers() {
        // Median of [0, 50, 100] is 50; both 0 and 100 deviate by 50 > 15,
        // leaving a single valid score.
        let err = median_filtered(&[0, 50, 100], 2, 15).unwrap_err();
        assert!(matches!(
            err,
            MitamaError::NoConsensus {
                valid: 1,
                submissions: 3
            }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_weighted_average() {
        // round((80*2 + 90*1) / 3) = round(83.33) = 83
        assert_eq!(weighted(&[(80, 2), (90, 1)]).unwrap(), 83);
        // Rounds half up: (50 + 51) / 2 = 50.5 -> 51
        assert_eq!(weighted(&[(50, 1), (51, 1)]).unwrap(), 51);
        // Single submission is its own consensus.
        assert_eq!(weighted(&[(42, 5)]).unwrap(), 42);
    }

    #[test]
    fn test_weighted_empty() {
        assert!(matches!(weighted(&[]), Err(MitamaError::NoSubmissions)));
    }
}
