//! Nonlinear one-phase decay fitter.
//!
//! Given time points `t_i` and observations `y_i` we fit
//!
//! ```text
//! y(t) = (y0 - plateau) * exp(-k t) + plateau
//! ```
//!
//! in two stages:
//!
//! 1. **Seed.** For each `k` on a log-spaced grid the model is linear in
//!    `(y0, plateau)`, so we solve that by least squares and keep the grid point
//!    with the lowest SSE. Grid points are evaluated in parallel; selection is
//!    deterministic (ties go to the lower grid index).
//! 2. **Refine.** Levenberg–Marquardt over all three parameters, starting from
//!    the seed, keeping `k > 0`.
//!
//! Standard errors come from the scaled covariance `SSE/(n-3) · (JᵀJ)⁻¹`, the
//! same estimate a nonlinear least-squares routine reports for unweighted data.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use rayon::prelude::*;

use crate::domain::{DecayFit, DecayParams, FitOptions, FitQuality};
use crate::error::AppError;
use crate::fit::rate_grid::rate_grid;
use crate::math::{r_squared, residual_sum_of_squares, solve_least_squares};
use crate::models::{fill_design_row, jacobian_row, predict};

/// Number of fitted parameters (`y0`, `plateau`, `k`).
pub const DECAY_PARAM_COUNT: usize = 3;

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
/// Floor for diagonal damping so a zero column still gets regularized.
const DIAG_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    idx: usize,
    params: DecayParams,
    sse: f64,
}

/// Fit the one-phase decay model to `(time, value)` points.
///
/// Non-finite points are ignored. At least three finite points are required.
pub fn fit_one_phase_decay(points: &[(f64, f64)], opts: &FitOptions) -> Result<DecayFit, AppError> {
    let (t, y): (Vec<f64>, Vec<f64>) = points
        .iter()
        .copied()
        .filter(|(t, y)| t.is_finite() && y.is_finite())
        .unzip();
    let n = t.len();
    if n < DECAY_PARAM_COUNT {
        return Err(AppError::numeric(format!(
            "One-phase decay needs at least {DECAY_PARAM_COUNT} finite points, got {n}."
        )));
    }

    let grid = rate_grid(opts.rate_min, opts.rate_max, opts.rate_steps)?;
    let seed = seed_from_grid(&grid, &t, &y)?;
    log::debug!(
        "decay seed: k={:.3e} y0={:.4} plateau={:.4} sse={:.4e}",
        seed.params.k,
        seed.params.y0,
        seed.params.plateau,
        seed.sse
    );

    let (params, sse, iterations) = refine(seed.params, seed.sse, &t, &y, opts);
    let std_errors = standard_errors(&params, sse, &t, &y);

    Ok(DecayFit {
        params,
        std_errors,
        quality: FitQuality {
            sse,
            rmse: (sse / n as f64).sqrt(),
            r_squared: r_squared(&y, sse),
            n,
        },
        iterations,
    })
}

fn seed_from_grid(grid: &[f64], t: &[f64], y: &[f64]) -> Result<Candidate, AppError> {
    let candidates: Vec<Candidate> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &k)| {
            evaluate_rate(k, t, y).map(|(params, sse)| Candidate { idx, params, sse })
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::numeric("No valid rate constant on the seeding grid."));
    }

    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.sse < best.sse || (c.sse == best.sse && c.idx < best.idx) {
            best = *c;
        }
    }
    Ok(best)
}

/// Solve `(y0, plateau)` by linear least squares at a fixed `k`.
fn evaluate_rate(k: f64, t: &[f64], y: &[f64]) -> Option<(DecayParams, f64)> {
    let n = t.len();
    let mut x = DMatrix::<f64>::zeros(n, 2);
    let mut row = [0.0; 2];
    for (i, &ti) in t.iter().enumerate() {
        fill_design_row(ti, k, &mut row);
        x[(i, 0)] = row[0];
        x[(i, 1)] = row[1];
    }
    let yv = DVector::from_column_slice(y);

    let beta = solve_least_squares(&x, &yv)?;
    let sse = residual_sum_of_squares(&x, &yv, &beta);
    if !sse.is_finite() {
        return None;
    }

    Some((
        DecayParams {
            y0: beta[0],
            plateau: beta[1],
            k,
        },
        sse,
    ))
}

fn refine(start: DecayParams, start_sse: f64, t: &[f64], y: &[f64], opts: &FitOptions) -> (DecayParams, f64, usize) {
    let mut params = start;
    let mut sse = start_sse;
    let mut lambda = LAMBDA_START;
    let mut iterations = 0usize;

    while iterations < opts.max_iterations {
        iterations += 1;
        let (jtj, jtr) = normal_equations(&params, t, y);

        let mut accepted = None;
        while lambda <= LAMBDA_MAX {
            let mut damped = jtj;
            for i in 0..DECAY_PARAM_COUNT {
                damped[(i, i)] += lambda * jtj[(i, i)].max(DIAG_FLOOR);
            }
            if let Some(delta) = damped.lu().solve(&jtr) {
                let trial = DecayParams {
                    y0: params.y0 + delta[0],
                    plateau: params.plateau + delta[1],
                    k: params.k + delta[2],
                };
                if is_admissible(&trial) {
                    let trial_sse = sum_squared_residuals(&trial, t, y);
                    if trial_sse < sse {
                        accepted = Some((trial, trial_sse));
                        break;
                    }
                }
            }
            lambda *= 10.0;
        }

        let Some((trial, trial_sse)) = accepted else {
            break;
        };
        let improvement = (sse - trial_sse) / sse.max(f64::MIN_POSITIVE);
        params = trial;
        sse = trial_sse;
        lambda = (lambda / 10.0).max(LAMBDA_MIN);

        if improvement < opts.tolerance || sse == 0.0 {
            break;
        }
    }

    (params, sse, iterations)
}

fn is_admissible(p: &DecayParams) -> bool {
    p.y0.is_finite() && p.plateau.is_finite() && p.k.is_finite() && p.k > 0.0
}

/// `JᵀJ` and `Jᵀr` for residuals `r = y - f(t)`.
fn normal_equations(params: &DecayParams, t: &[f64], y: &[f64]) -> (Matrix3<f64>, Vector3<f64>) {
    let mut jtj = Matrix3::<f64>::zeros();
    let mut jtr = Vector3::<f64>::zeros();
    for (&ti, &yi) in t.iter().zip(y.iter()) {
        let j = Vector3::from(jacobian_row(params, ti));
        let r = yi - predict(params, ti);
        jtj += j * j.transpose();
        jtr += j * r;
    }
    (jtj, jtr)
}

fn sum_squared_residuals(params: &DecayParams, t: &[f64], y: &[f64]) -> f64 {
    t.iter()
        .zip(y.iter())
        .map(|(&ti, &yi)| {
            let r = yi - predict(params, ti);
            r * r
        })
        .sum()
}

fn standard_errors(params: &DecayParams, sse: f64, t: &[f64], y: &[f64]) -> Option<DecayParams> {
    let dof = t.len().checked_sub(DECAY_PARAM_COUNT).filter(|&d| d > 0)?;
    let (jtj, _) = normal_equations(params, t, y);
    let cov = jtj.try_inverse()?;
    let s2 = sse / dof as f64;

    let err = |i: usize| (s2 * cov[(i, i)]).sqrt();
    let out = DecayParams {
        y0: err(0),
        plateau: err(1),
        k: err(2),
    };
    if out.y0.is_finite() && out.plateau.is_finite() && out.k.is_finite() {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(params: &DecayParams, times: &[f64]) -> Vec<(f64, f64)> {
        times.iter().map(|&t| (t, predict(params, t))).collect()
    }

    const TIMES: [f64; 12] = [
        0.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1200.0, 1800.0, 3600.0, 7200.0, 10_800.0,
    ];

    #[test]
    fn recovers_noiseless_folding_curve() {
        let truth = DecayParams { y0: 0.02, plateau: 0.85, k: 1.7e-3 };
        let points = synthetic(&truth, &TIMES);

        let fit = fit_one_phase_decay(&points, &FitOptions::default()).unwrap();
        assert!((fit.params.y0 - truth.y0).abs() < 1e-6, "{:?}", fit.params);
        assert!((fit.params.plateau - truth.plateau).abs() < 1e-6, "{:?}", fit.params);
        assert!((fit.params.k - truth.k).abs() / truth.k < 1e-5, "{:?}", fit.params);
        assert!(fit.quality.sse < 1e-12);
        assert_eq!(fit.quality.n, TIMES.len());
        assert!(fit.quality.r_squared.unwrap() > 0.999_999);
    }

    #[test]
    fn noisy_fit_reports_standard_errors() {
        let truth = DecayParams { y0: 0.0, plateau: 0.9, k: 5e-4 };
        let wobble = [0.01, -0.012, 0.008, -0.004, 0.011, -0.009, 0.003, -0.006, 0.007, -0.01, 0.002, -0.003];
        let points: Vec<(f64, f64)> = TIMES
            .iter()
            .zip(wobble.iter())
            .map(|(&t, &e)| (t, predict(&truth, t) + e))
            .collect();

        let fit = fit_one_phase_decay(&points, &FitOptions::default()).unwrap();
        let errs = fit.std_errors.expect("dof > 0");
        assert!(errs.k > 0.0 && errs.k.is_finite());
        assert!((fit.params.k - truth.k).abs() < 3.0 * errs.k + 1e-4);
        assert!(fit.params.k > 0.0);
    }

    #[test]
    fn ignores_missing_points() {
        let truth = DecayParams { y0: 0.0, plateau: 1.0, k: 1e-3 };
        let mut points = synthetic(&truth, &TIMES);
        points.push((f64::NAN, 0.5));
        points.push((400.0, f64::NAN));
        let fit = fit_one_phase_decay(&points, &FitOptions::default()).unwrap();
        assert_eq!(fit.quality.n, TIMES.len());
    }

    #[test]
    fn too_few_points_is_an_error() {
        let err = fit_one_phase_decay(&[(0.0, 0.0), (10.0, 0.5)], &FitOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn exact_fit_has_no_standard_errors() {
        let truth = DecayParams { y0: 0.0, plateau: 1.0, k: 1e-2 };
        let points = synthetic(&truth, &[0.0, 60.0, 300.0]);
        let fit = fit_one_phase_decay(&points, &FitOptions::default()).unwrap();
        assert!(fit.std_errors.is_none());
    }

    #[test]
    fn fitting_is_deterministic() {
        let truth = DecayParams { y0: 0.1, plateau: 0.7, k: 3e-3 };
        let points = synthetic(&truth, &TIMES);
        let a = fit_one_phase_decay(&points, &FitOptions::default()).unwrap();
        let b = fit_one_phase_decay(&points, &FitOptions::default()).unwrap();
        assert_eq!(a, b);
    }
}
