//! Rate-constant grid generation.
//!
//! The decay fitter seeds Levenberg–Marquardt from a deterministic grid search
//! over `k`. Folding half-lives span seconds to days, so the grid is log-spaced.

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::input(format!(
            "Invalid rate range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::input("Rate grid steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    Ok((0..steps).map(|i| (ln_min + step * i as f64).exp()).collect())
}

/// Rate-constant grid for the one-phase decay seed search.
pub fn rate_grid(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    log_space(min, max, steps)
}

/// `n` evenly spaced points over `[start, end]`, endpoints included.
///
/// A degenerate `n < 2` yields just `start`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start];
    }
    let step = (end - start) / (n as f64 - 1.0);
    (0..n)
        .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(1e-6, 1.0, 7).unwrap();
        assert_eq!(v.len(), 7);
        assert!((v[0] - 1e-6).abs() < 1e-18);
        assert!((v[6] - 1.0).abs() < 1e-12);
        assert!(v.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn invalid_rate_range_is_an_input_error() {
        let err = rate_grid(0.0, 1.0, 10).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(rate_grid(1e-3, 1.0, 1).is_err());
    }

    #[test]
    fn linspace_hits_both_ends() {
        let v = linspace(0.0, 10_800.0, 100);
        assert_eq!(v.len(), 100);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[99], 10_800.0);
    }
}
