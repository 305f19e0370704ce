//! Synthetic gel-kinetics workbooks.
//!
//! Generated sheets follow the input layout exactly (two-row header, one column
//! group per replicate, a trailing `Summary` group) so they exercise the same
//! parsing path as real measurements. Band intensities follow one-phase folding
//! kinetics with Gaussian noise on the fraction folded.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use calamine::Data;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rust_xlsxwriter::Workbook;

use crate::domain::{DecayParams, TIME_COLUMN};
use crate::error::AppError;
use crate::models::predict;

/// Sampling times in seconds. The last point lies beyond the default 3 h window.
pub const DEFAULT_TIMES: [f64; 13] = [
    0.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0, 5400.0, 7200.0, 10_800.0, 14_400.0,
];

/// Summed band intensity per lane; unfolded + folded add up to this before noise.
const LANE_INTENSITY: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedCondition {
    pub name: String,
    /// Mean folding rate constant (s⁻¹).
    pub k: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub conditions: Vec<SimulatedCondition>,
    pub replicates: usize,
    pub times: Vec<f64>,
    pub y0: f64,
    pub plateau: f64,
    /// Standard deviation of the additive noise on the fraction folded.
    pub noise_sd: f64,
    /// Log-normal spread of the per-replicate rate constant.
    pub rate_spread: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let conditions = [("WT", 1.2e-3), ("Mut-A", 6.0e-4), ("Mut-B", 2.5e-4)]
            .into_iter()
            .map(|(name, k)| SimulatedCondition {
                name: name.to_string(),
                k,
            })
            .collect();
        Self {
            conditions,
            replicates: 3,
            times: DEFAULT_TIMES.to_vec(),
            y0: 0.05,
            plateau: 0.9,
            noise_sd: 0.02,
            rate_spread: 0.1,
            seed: 7,
        }
    }
}

/// One worksheet as a grid of cells, header rows included.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Data>>,
}

pub fn simulate_workbook(config: &SimulationConfig) -> Result<Vec<SheetGrid>, AppError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(simulation_seed(config));
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let mut sheets = Vec::with_capacity(config.conditions.len());
    for condition in &config.conditions {
        // Rows are filled column group by column group: replicate-major.
        let mut fractions: Vec<Vec<f64>> = Vec::with_capacity(config.replicates);
        for _ in 0..config.replicates {
            let k = condition.k * (config.rate_spread * normal.sample(&mut rng)).exp();
            let params = DecayParams {
                y0: config.y0,
                plateau: config.plateau,
                k,
            };
            let series = config
                .times
                .iter()
                .map(|&t| (predict(&params, t) + config.noise_sd * normal.sample(&mut rng)).clamp(0.0, 1.0))
                .collect();
            fractions.push(series);
        }
        sheets.push(build_sheet(&condition.name, &config.times, &fractions));
    }

    log::debug!(
        "simulated {} condition(s) x {} replicate(s) x {} time point(s)",
        config.conditions.len(),
        config.replicates,
        config.times.len()
    );
    Ok(sheets)
}

fn build_sheet(name: &str, times: &[f64], fractions: &[Vec<f64>]) -> SheetGrid {
    let text = |s: &str| Data::String(s.to_string());

    let mut top = vec![Data::Empty];
    let mut second = vec![text(TIME_COLUMN)];
    for rep in 0..fractions.len() {
        top.extend([text(&format!("Rep{}", rep + 1)), Data::Empty, Data::Empty]);
        second.extend([text("Unfolded"), text("Folded"), text("Fraction folded")]);
    }
    top.extend([text("Summary"), Data::Empty]);
    second.extend([text("Average"), text("Range")]);

    let mut rows = vec![top, second];
    for (i, &t) in times.iter().enumerate() {
        let mut row = vec![Data::Float(t)];
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for series in fractions {
            let f = series[i];
            let folded = (f * LANE_INTENSITY).round();
            row.extend([
                Data::Float(LANE_INTENSITY - folded),
                Data::Float(folded),
                Data::Float(f),
            ]);
            lo = lo.min(f);
            hi = hi.max(f);
            sum += f;
        }
        row.extend([Data::Float(sum / fractions.len() as f64), Data::Float(hi - lo)]);
        rows.push(row);
    }

    SheetGrid {
        name: name.to_string(),
        rows,
    }
}

/// Save sheets as an `.xlsx` workbook, one worksheet per grid.
pub fn write_workbook(path: &Path, sheets: &[SheetGrid]) -> Result<(), AppError> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| AppError::input(format!("Failed to write workbook: {e}"));

    let mut workbook = Workbook::new();
    for grid in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(grid.name.as_str()).map_err(xlsx_err)?;
        for (r, row) in grid.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Data::Float(v) => {
                        sheet.write_number(r, c, *v).map_err(xlsx_err)?;
                    }
                    Data::Int(v) => {
                        sheet.write_number(r, c, *v as f64).map_err(xlsx_err)?;
                    }
                    Data::String(s) => {
                        sheet.write_string(r, c, s.as_str()).map_err(xlsx_err)?;
                    }
                    _ => {}
                }
            }
        }
    }
    workbook
        .save(path)
        .map_err(|e| AppError::input(format!("Failed to save workbook '{}': {e}", path.display())))?;
    Ok(())
}

fn validate(config: &SimulationConfig) -> Result<(), AppError> {
    if config.conditions.is_empty() {
        return Err(AppError::input("Simulation needs at least one condition."));
    }
    if config.replicates == 0 {
        return Err(AppError::input("Replicate count must be > 0."));
    }
    if config.times.is_empty() || config.times.iter().any(|t| !t.is_finite()) {
        return Err(AppError::input("Simulation times must be a non-empty list of finite values."));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(AppError::input("Noise standard deviation must be finite and >= 0."));
    }
    if !(config.rate_spread.is_finite() && config.rate_spread >= 0.0) {
        return Err(AppError::input("Rate spread must be finite and >= 0."));
    }
    for c in &config.conditions {
        if !(c.k.is_finite() && c.k > 0.0) {
            return Err(AppError::input(format!("Rate constant for '{}' must be > 0.", c.name)));
        }
    }
    Ok(())
}

fn simulation_seed(config: &SimulationConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.replicates.hash(&mut hasher);
    for c in &config.conditions {
        c.name.hash(&mut hasher);
        c.k.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
