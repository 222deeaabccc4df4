//! Small descriptive statistics shared by the clustering and plotting code.

use crate::error::{KolosalError, Result};
use ndarray::ArrayView2;

/// Percentile of `values` using linear interpolation between closest ranks.
///
/// `q` is in percent (`0.0..=100.0`). Matches the default method of
/// `numpy.percentile`: the rank is `q / 100 * (n - 1)` over the sorted values.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(KolosalError::DataError(
            "percentile of an empty sequence".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(KolosalError::invalid_parameter(
            "percentile",
            q,
            "must be within [0, 100]",
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(percentile_sorted(&sorted, q))
}

/// Same as [`percentile`] but over an already sorted, non-empty slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Number of distinct values, comparing by bit-exact total order.
pub fn unique_count(values: impl IntoIterator<Item = f64>) -> usize {
    let mut v: Vec<f64> = values.into_iter().collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup_by(|a, b| a.total_cmp(b).is_eq());
    v.len()
}

/// Minimum and maximum of a sequence, `None` when it is empty.
pub fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Reject tables containing NaN or infinite entries.
pub fn ensure_finite(x: &ArrayView2<f64>, what: &str) -> Result<()> {
    if let Some(((row, col), v)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(KolosalError::DataError(format!(
            "{} contains a non-finite value {} at row {}, column {}",
            what, v, row, col
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&v, 100.0).unwrap(), 4.0);
        assert!((percentile(&v, 50.0).unwrap() - 2.5).abs() < 1e-12);
        // rank = 0.9 * 3 = 2.7
        assert!((percentile(&v, 90.0).unwrap() - 3.7).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let v = [10.0, 0.0, 5.0];
        assert!((percentile(&v, 50.0).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_rejects_bad_input() {
        assert!(percentile(&[], 50.0).is_err());
        assert!(percentile(&[1.0], 100.5).is_err());
        assert!(percentile(&[1.0], -1.0).is_err());
    }

    #[test]
    fn test_unique_count() {
        assert_eq!(unique_count(vec![1.0, 1.0, 0.0, 1.0]), 2);
        assert_eq!(unique_count(vec![3.0, 2.0, 1.0]), 3);
        assert_eq!(unique_count(Vec::new()), 0);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(vec![3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(min_max(Vec::new()), None);
    }

    #[test]
    fn test_ensure_finite() {
        let good = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(ensure_finite(&good.view(), "points").is_ok());
        let bad = array![[1.0, f64::NAN]];
        let err = ensure_finite(&bad.view(), "points").unwrap_err();
        assert!(err.to_string().contains("row 0, column 1"));
    }
}
