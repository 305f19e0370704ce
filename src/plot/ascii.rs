//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted curve: `-` line
//!
//! Normalized rates get a horizontal bar chart (`#`) instead.

use crate::domain::{DecayFit, NormalizedRates};
use crate::math::mean;
use crate::models::decay_curve;

/// Render observed `(time, fraction)` points with a fitted decay curve.
pub fn render_ascii_plot(points: &[(f64, f64)], fit: &DecayFit, width: usize, height: usize) -> String {
    let (t_min, t_max) = x_range(points).unwrap_or((0.0, 1.0));
    let curve = decay_curve(&fit.params, t_min, t_max, width.max(2));
    render_plot(points, Some(&curve), width, height)
}

/// Render a fitted curve alone (e.g. from a saved analysis file).
pub fn render_ascii_curve(fit: &DecayFit, t_min: f64, t_max: f64, width: usize, height: usize) -> String {
    let curve = decay_curve(&fit.params, t_min, t_max, width.max(2));
    render_plot(&[], Some(&curve), width, height)
}

fn render_plot(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all: Vec<(f64, f64)> = points.iter().chain(curve.unwrap_or_default()).copied().collect();
    let (t_min, t_max) = x_range(&all).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(&all).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = curve {
        draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);
    }
    for &(t, y) in points {
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: time=[{t_min:.0}, {t_max:.0}] s | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Horizontal bars of the mean normalized rate per condition.
///
/// The scale runs to 100 % or the largest mean, whichever is greater.
pub fn render_rate_bars(rates: &NormalizedRates, width: usize) -> String {
    let width = width.max(10);
    let rows: Vec<(&str, Option<f64>, usize)> = rates
        .conditions
        .iter()
        .map(|c| {
            let values: Vec<f64> = c.reactions.iter().map(|r| r.percent).collect();
            (c.condition.as_str(), mean(&values), c.reactions.len())
        })
        .collect();

    let label_w = rows.iter().map(|(name, _, _)| name.chars().count()).max().unwrap_or(0);
    let scale = rows
        .iter()
        .filter_map(|(_, m, _)| *m)
        .fold(100.0_f64, f64::max);

    let mut out = format!("Initial rate, % of {}:\n", rates.control);
    for (name, m, n) in rows {
        match m {
            Some(m) => {
                let len = ((m.max(0.0) / scale) * width as f64).round() as usize;
                out.push_str(&format!(
                    "{name:<label_w$} |{:<width$}| {m:>6.1}% (n={n})\n",
                    "#".repeat(len.min(width))
                ));
            }
            None => out.push_str(&format!("{name:<label_w$} |{:<width$}|    n/a (n={n})\n", "")),
        }
    }
    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    span(points.iter().map(|p| p.0))
}

fn y_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    span(points.iter().map(|p| p.1))
}

/// `(min, max)` over finite values; `None` when empty or flat.
fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (hi > lo).then_some((lo, hi))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
