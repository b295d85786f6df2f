//! Shared statistics primitives for the hypothesis tests.
//!
//! Degenerate inputs (too few observations, zero variance) are reported as
//! None rather than 0.0 or NaN so callers can distinguish "undefined" from
//! "no relationship".

/// Arithmetic mean. None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased sample variance (n - 1 denominator). None for fewer than two
/// observations.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(sum_sq / (values.len() - 1) as f64)
}

/// Pearson correlation coefficient.
///
/// None when the slices differ in length, hold fewer than two pairs, or
/// either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x > 0.0 && var_y > 0.0 {
        Some(cov / (var_x.sqrt() * var_y.sqrt()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_sample_variance_uses_n_minus_one() {
        // Var([1, 2, 3, 4]) with n-1 = 10/6... sum sq dev = 5.0, / 3 = 1.666...
        let var = sample_variance(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((var - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), None);
    }

    #[test]
    fn test_pearson_identical_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let r = pearson(&x, &x).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_inverse_is_negative_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [4.0, 3.0, 2.0, 1.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate_is_undefined() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
    }
}
