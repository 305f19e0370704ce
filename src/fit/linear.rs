//! Ordinary least squares straight-line fit, used for initial folding rates.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitQuality, LinearFit};
use crate::error::AppError;
use crate::math::{r_squared, range, residual_sum_of_squares, solve_least_squares};

/// Fit `y = slope * x + intercept` to the finite points.
pub fn fit_linear(points: &[(f64, f64)]) -> Result<LinearFit, AppError> {
    let (x, y): (Vec<f64>, Vec<f64>) = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    let n = x.len();
    if n < 2 {
        return Err(AppError::numeric(format!(
            "Linear fit needs at least 2 finite points, got {n}."
        )));
    }
    if range(&x).unwrap_or(0.0) <= 0.0 {
        return Err(AppError::numeric("Linear fit needs at least two distinct x values."));
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { x[i] } else { 1.0 });
    let yv = DVector::from_column_slice(&y);
    let beta = solve_least_squares(&design, &yv)
        .ok_or_else(|| AppError::numeric("Linear fit is ill-conditioned."))?;
    let sse = residual_sum_of_squares(&design, &yv, &beta);

    let (slope_err, intercept_err) = if n > 2 {
        match (design.transpose() * &design).try_inverse() {
            Some(inv) => {
                let s2 = sse / (n as f64 - 2.0);
                (
                    Some((s2 * inv[(0, 0)]).sqrt()).filter(|v| v.is_finite()),
                    Some((s2 * inv[(1, 1)]).sqrt()).filter(|v| v.is_finite()),
                )
            }
            None => (None, None),
        }
    } else {
        (None, None)
    };

    Ok(LinearFit {
        slope: beta[0],
        intercept: beta[1],
        slope_err,
        intercept_err,
        quality: FitQuality {
            sse,
            rmse: (sse / n as f64).sqrt(),
            r_squared: r_squared(&y, sse),
            n,
        },
    })
}
