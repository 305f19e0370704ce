//! Linear least squares solver.
//!
//! Both kinetic models reduce to small linear regressions at some point:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! - the initial-rate line has the design row `[x, 1]`
//! - the one-phase decay is linear in `(y0, plateau)` once `k` is fixed, with the
//!   design row `[e^{-kt}, 1 - e^{-kt}]`; the rate grid search solves this once per
//!   candidate `k`
//!
//! We solve through SVD so tall (more rows than columns) and nearly collinear
//! systems both work. Nalgebra's `QR::solve` is intended for square systems and
//! will panic for non-square matrices.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.nrows() == 0 {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Early time points make `e^{-kt}` and `1 - e^{-kt}` nearly collinear for very
    // small `k`, so loosen the singular value cutoff step by step.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Sum of squared residuals `Σ (y_i - x_i^T β)^2`.
pub fn residual_sum_of_squares(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>) -> f64 {
    let residuals = y - x * beta;
    residuals.norm_squared()
}
