//! Descriptive statistics over replicate values.
//!
//! All helpers ignore non-finite inputs, so a missing cell in one replicate does
//! not poison the statistic for the whole time point.

/// Arithmetic mean of the finite values, `None` when there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

/// Sample standard deviation (n - 1 denominator), `None` below two finite values.
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    let m = mean(&finite)?;
    let ss: f64 = finite.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (finite.len() as f64 - 1.0)).sqrt())
}

/// Standard error of the mean.
pub fn sem(values: &[f64]) -> Option<f64> {
    let n = values.iter().filter(|v| v.is_finite()).count();
    sample_sd(values).map(|sd| sd / (n as f64).sqrt())
}

/// `max - min` of the finite values.
pub fn range(values: &[f64]) -> Option<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo.is_finite() && hi.is_finite() { Some(hi - lo) } else { None }
}

/// Coefficient of determination `1 - SSE/SST`.
///
/// `None` when the observations have no spread (SST = 0).
pub fn r_squared(y: &[f64], sse: f64) -> Option<f64> {
    let m = mean(y)?;
    let sst: f64 = y.iter().filter(|v| v.is_finite()).map(|v| (v - m) * (v - m)).sum();
    if sst > 0.0 && sse.is_finite() {
        Some(1.0 - sse / sst)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_statistics() {
        let v = [0.2, 0.4, 0.6];
        assert!((mean(&v).unwrap() - 0.4).abs() < 1e-12);
        assert!((sample_sd(&v).unwrap() - 0.2).abs() < 1e-12);
        assert!((sem(&v).unwrap() - 0.2 / 3f64.sqrt()).abs() < 1e-12);
        assert!((range(&v).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let v = [1.0, f64::NAN, 3.0];
        assert_eq!(mean(&v), Some(2.0));
        assert_eq!(range(&v), Some(2.0));
        assert!(sample_sd(&[1.0, f64::NAN]).is_none());
        assert!(mean(&[f64::NAN]).is_none());
    }

    #[test]
    fn r_squared_undefined_without_spread() {
        assert!(r_squared(&[0.5, 0.5], 0.0).is_none());
        assert_eq!(r_squared(&[0.0, 1.0], 0.0), Some(1.0));
    }
}
