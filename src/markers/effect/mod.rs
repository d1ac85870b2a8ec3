//! Per-feature moments and the effect sizes derived from them.

use std::cmp::Ordering;

/// Summary of one feature's values in one (group, block) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMoments {
    pub n: usize,
    pub mean: f64,
    /// Sample variance (n - 1 denominator), NaN with fewer than two observations
    pub variance: f64,
    /// Proportion of observations with a value above zero
    pub detected: f64,
}

impl GroupMoments {
    pub fn empty() -> Self {
        GroupMoments {
            n: 0,
            mean: f64::NAN,
            variance: f64::NAN,
            detected: f64::NAN,
        }
    }
}

/// Compute the moments of `values[i]` for every `i` in `indices`.
///
/// The variance uses a second pass over the centred values rather than the sum of squares.
pub fn compute_moments(values: &[f64], indices: &[usize]) -> GroupMoments {
    let n = indices.len();
    if n == 0 {
        return GroupMoments::empty();
    }

    let mut sum = 0.0;
    let mut num_detected = 0usize;
    for &i in indices {
        let value = values[i];
        sum += value;
        if value > 0.0 {
            num_detected += 1;
        }
    }
    let nf = n as f64;
    let mean = sum / nf;

    let variance = if n > 1 {
        indices
            .iter()
            .map(|&i| (values[i] - mean).powi(2))
            .sum::<f64>()
            / (nf - 1.0)
    } else {
        f64::NAN
    };

    GroupMoments {
        n,
        mean,
        variance,
        detected: num_detected as f64 / nf,
    }
}

/// Pooled standard deviation of two groups, bounded below by `sqrt(floor)`.
///
/// The variance of a group with fewer than two observations is unknown; in that case only
/// the other group's variance is used, and if neither is known the floor applies.
pub fn pooled_sd(left: &GroupMoments, right: &GroupMoments, floor: f64) -> f64 {
    let pooled = match (left.variance.is_nan(), right.variance.is_nan()) {
        (false, false) => (left.variance + right.variance) / 2.0,
        (false, true) => left.variance,
        (true, false) => right.variance,
        (true, true) => 0.0,
    };
    pooled.max(floor).sqrt()
}

/// Cohen's d of `left` against `right`, after shifting the difference by `threshold`.
pub fn cohens_d(left: &GroupMoments, right: &GroupMoments, threshold: f64, floor: f64) -> f64 {
    (left.mean - right.mean - threshold) / pooled_sd(left, right, floor)
}

/// Gather the values of a combination and sort them ascending.
pub fn sorted_values(values: &[f64], indices: &[usize]) -> Vec<f64> {
    let mut out: Vec<f64> = indices.iter().map(|&i| values[i]).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Probability that a `left` value minus `threshold` exceeds a `right` value, ties counting
/// one half. Both inputs must be sorted ascending; runs in `O(left.len() + right.len())`.
pub fn auc_from_sorted(left: &[f64], right: &[f64], threshold: f64) -> f64 {
    if left.is_empty() || right.is_empty() {
        return f64::NAN;
    }

    let mut below = 0usize;
    let mut not_above = 0usize;
    let mut total = 0.0;
    for &x in left {
        let shifted = x - threshold;
        while below < right.len() && right[below] < shifted {
            below += 1;
        }
        if not_above < below {
            not_above = below;
        }
        while not_above < right.len() && right[not_above] <= shifted {
            not_above += 1;
        }
        total += below as f64 + 0.5 * (not_above - below) as f64;
    }

    total / (left.len() as f64 * right.len() as f64)
}

/// Descending comparison that places NaN after every number.
pub(crate) fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_moments() {
        let values = [2.0, 2.2, 1.8, 0.0, 8.0];
        let m = compute_moments(&values, &[0, 1, 2, 3]);
        assert_eq!(m.n, 4);
        assert_abs_diff_eq!(m.mean, 1.5, epsilon = 1e-12);
        // deviations: 0.5, 0.7, 0.3, -1.5 -> 0.25 + 0.49 + 0.09 + 2.25 = 3.08
        assert_abs_diff_eq!(m.variance, 3.08 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.detected, 0.75, epsilon = 1e-12);

        let single = compute_moments(&values, &[4]);
        assert!(single.variance.is_nan());
        assert_eq!(single.detected, 1.0);

        assert!(compute_moments(&values, &[]).mean.is_nan());
    }

    #[test]
    fn test_cohens_d() {
        // Same layout as a clear two-group difference: ~2 vs ~8
        let values = [2.0, 2.2, 1.8, 8.0, 7.5, 8.5];
        let left = compute_moments(&values, &[0, 1, 2]);
        let right = compute_moments(&values, &[3, 4, 5]);

        let d = cohens_d(&right, &left, 0.0, 1e-8);
        // pooled variance = (0.04 + 0.25) / 2
        assert_abs_diff_eq!(d, 6.0 / 0.145f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(cohens_d(&left, &right, 0.0, 1e-8), -d, epsilon = 1e-12);

        // The threshold is subtracted in both directions
        let shifted = cohens_d(&right, &left, 1.0, 1e-8);
        assert_abs_diff_eq!(shifted, 5.0 / 0.145f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_zero_variance_uses_floor() {
        let values = [5.0, 5.0, 5.0, 10.0, 10.0, 10.0];
        let left = compute_moments(&values, &[0, 1, 2]);
        let right = compute_moments(&values, &[3, 4, 5]);

        let d = cohens_d(&right, &left, 0.0, 1e-8);
        assert!(d.is_finite());
        assert_abs_diff_eq!(d, 5.0 / 1e-4, epsilon = 1e-6);

        let same = cohens_d(&left, &left, 0.0, 1e-8);
        assert_eq!(same, 0.0);
    }

    #[test]
    fn test_single_observation_borrows_other_variance() {
        let values = [1.0, 2.0, 3.0, 10.0];
        let left = compute_moments(&values, &[0, 1, 2]);
        let right = compute_moments(&values, &[3]);
        assert_abs_diff_eq!(pooled_sd(&left, &right, 1e-8), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pooled_sd(&right, &right, 1e-8), 1e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_auc_basic() {
        let left = [4.0, 5.0, 6.0];
        let right = [1.0, 2.0, 3.0];
        assert_abs_diff_eq!(auc_from_sorted(&left, &right, 0.0), 1.0);
        assert_abs_diff_eq!(auc_from_sorted(&right, &left, 0.0), 0.0);
        assert!(auc_from_sorted(&left, &[], 0.0).is_nan());
    }

    #[test]
    fn test_auc_ties_and_complement() {
        let left = [0.0, 0.0, 1.0, 3.0];
        let right = [0.0, 1.0, 1.0, 2.0, 5.0];
        let forward = auc_from_sorted(&left, &right, 0.0);
        let reverse = auc_from_sorted(&right, &left, 0.0);

        // each 0 ties once (0.5 + 0.5), 1 beats one and ties two (2.0), 3 beats four
        assert_abs_diff_eq!(forward, 7.0 / 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(forward + reverse, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_auc_threshold() {
        let left = [2.0, 3.0];
        let right = [1.0, 2.0];
        // shifted left = [1, 2]: 1 vs {1,2} -> 0.5; 2 vs {1,2} -> 1.5
        assert_abs_diff_eq!(auc_from_sorted(&left, &right, 1.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sorted_values_and_ordering() {
        let values = [3.0, -1.0, 2.0, 0.5];
        assert_eq!(sorted_values(&values, &[0, 2, 1]), vec![-1.0, 2.0, 3.0]);

        let mut xs = vec![1.0, f64::NAN, 3.0, 2.0];
        xs.sort_by(|a, b| descending_nan_last(*a, *b));
        assert_eq!(&xs[..3], &[3.0, 2.0, 1.0]);
        assert!(xs[3].is_nan());
    }
}
