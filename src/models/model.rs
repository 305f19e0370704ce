//! Model evaluation for the one-phase decay and the initial-rate line.
//!
//! The fitter relies on three primitive operations:
//! - build a design row for a given time and rate constant (for the linear seed)
//! - the Jacobian row of the full nonlinear model (for Levenberg–Marquardt)
//! - predict y(t) given parameters (for residuals and plots)

use crate::domain::{DecayParams, LinearFit};

/// One-phase decay: `(y0 - plateau) * exp(-k t) + plateau`.
///
/// For folding data `y0` is the fraction folded at `t = 0` and `plateau` the
/// fraction folded at completion, so the curve rises when `plateau > y0`.
pub fn one_phase_decay(t: f64, y0: f64, plateau: f64, k: f64) -> f64 {
    (y0 - plateau) * (-k * t).exp() + plateau
}

/// Straight line `slope * x + intercept`.
pub fn linear(x: f64, slope: f64, intercept: f64) -> f64 {
    slope * x + intercept
}

/// Predict the decay model at `t`.
pub fn predict(params: &DecayParams, t: f64) -> f64 {
    one_phase_decay(t, params.y0, params.plateau, params.k)
}

/// Design row for the `(y0, plateau)` regression at fixed `k`.
///
/// `y(t) = y0 * e^{-kt} + plateau * (1 - e^{-kt})`
pub fn fill_design_row(t: f64, k: f64, out: &mut [f64; 2]) {
    let e = (-k * t).exp();
    out[0] = e;
    out[1] = 1.0 - e;
}

/// Partial derivatives of the decay model with respect to `(y0, plateau, k)`.
pub fn jacobian_row(params: &DecayParams, t: f64) -> [f64; 3] {
    let e = (-params.k * t).exp();
    [e, 1.0 - e, -(params.y0 - params.plateau) * t * e]
}

/// Sample the decay model on `n` evenly spaced points over `[t_min, t_max]`.
pub fn decay_curve(params: &DecayParams, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
    crate::fit::linspace(t_min, t_max, n)
        .into_iter()
        .map(|t| (t, predict(params, t)))
        .collect()
}

/// Sample a fitted line on `n` evenly spaced points over `[x_min, x_max]`.
pub fn line_curve(fit: &LinearFit, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    crate::fit::linspace(x_min, x_max, n)
        .into_iter()
        .map(|x| (x, linear(x, fit.slope, fit.intercept)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_limits() {
        let p = DecayParams { y0: 0.1, plateau: 0.9, k: 0.01 };
        assert!((predict(&p, 0.0) - 0.1).abs() < 1e-12);
        assert!((predict(&p, 1e6) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn design_row_reproduces_prediction() {
        let p = DecayParams { y0: 0.05, plateau: 0.8, k: 2e-3 };
        let mut row = [0.0; 2];
        fill_design_row(300.0, p.k, &mut row);
        let y = row[0] * p.y0 + row[1] * p.plateau;
        assert!((y - predict(&p, 300.0)).abs() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_difference() {
        let p = DecayParams { y0: 0.0, plateau: 1.0, k: 1e-3 };
        let t = 500.0;
        let h = 1e-9;
        let bumped = DecayParams { k: p.k + h, ..p };
        let numeric = (predict(&bumped, t) - predict(&p, t)) / h;
        let analytic = jacobian_row(&p, t)[2];
        assert!((numeric - analytic).abs() < 1e-4, "{numeric} vs {analytic}");
    }

    #[test]
    fn curve_spans_requested_range() {
        let p = DecayParams { y0: 0.0, plateau: 1.0, k: 1e-3 };
        let curve = decay_curve(&p, 0.0, 100.0, 100);
        assert_eq!(curve.len(), 100);
        assert_eq!(curve[0].0, 0.0);
        assert!((curve[99].0 - 100.0).abs() < 1e-12);
    }
}
