//! Statistical helpers

/// Median of the finite values in `values`.
///
/// NaN entries are skipped. Returns `None` when no valid values remain.
/// For an even count the two middle values are averaged.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return None;
    }

    valid.sort_by(|a, b| a.total_cmp(b));

    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        Some((valid[mid - 1] + valid[mid]) / 2.0)
    } else {
        Some(valid[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_median_even() {
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_median_skips_nan() {
        assert_relative_eq!(median(&[f64::NAN, 5.0, 1.0, f64::NAN, 3.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_median_empty() {
        assert!(median(&[]).is_none());
        assert!(median(&[f64::NAN]).is_none());
    }
}
