//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and averaging
//! - exported to CSV/XLSX/JSON
//! - reloaded later for terminal previews
//!
//! Every nested collection is an ordered `Vec` with name lookup helpers rather than
//! a hash map: sheet order and reaction order are part of the output (legend order,
//! table row order) and must be reproducible.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column label for the shared time column in every parsed table.
pub const TIME_COLUMN: &str = "Time (s)";

/// Inclusive time window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: f64,
    pub max: f64,
}

impl TimeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Boundary-inclusive membership test (`min <= t <= max`). NaN is never contained.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.min && t <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl Default for TimeRange {
    /// Three hours, the length of a standard folding reaction.
    fn default() -> Self {
        Self::new(0.0, 10_800.0)
    }
}

/// One measured column of a reaction table (a "Fraction folded…" column).
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    /// Values aligned with the table's time column. Missing cells are NaN.
    pub values: Vec<f64>,
}

/// Time course for one reaction (replicate) within a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionTable {
    pub name: String,
    pub time: Vec<f64>,
    /// First "Fraction folded" column; this is the one that gets fitted.
    pub fraction_folded: Series,
    /// Any further "Fraction folded…" columns in the same group, in sheet order.
    pub extra: Vec<Series>,
}

impl ReactionTable {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// `(time, fraction folded)` pairs with both values finite.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.time
            .iter()
            .zip(self.fraction_folded.values.iter())
            .filter(|(t, y)| t.is_finite() && y.is_finite())
            .map(|(&t, &y)| (t, y))
            .collect()
    }

    /// Column labels in table order, time first.
    pub fn column_labels(&self) -> Vec<&str> {
        let mut out = vec![TIME_COLUMN, self.fraction_folded.label.as_str()];
        out.extend(self.extra.iter().map(|s| s.label.as_str()));
        out
    }
}

/// All reactions recorded for one condition (one workbook sheet).
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionData {
    pub name: String,
    pub reactions: Vec<ReactionTable>,
}

impl ConditionData {
    pub fn reaction(&self, name: &str) -> Option<&ReactionTable> {
        self.reactions.iter().find(|r| r.name == name)
    }
}

/// Parsed workbook: condition → reaction → time course.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    pub conditions: Vec<ConditionData>,
}

impl DataSet {
    pub fn condition(&self, name: &str) -> Option<&ConditionData> {
        self.conditions.iter().find(|c| c.name == name)
    }

    pub fn reaction_count(&self) -> usize {
        self.conditions.iter().map(|c| c.reactions.len()).sum()
    }
}

/// Parameters of `y(t) = (y0 - plateau) * exp(-k t) + plateau`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayParams {
    pub y0: f64,
    pub plateau: f64,
    /// Rate constant in s⁻¹.
    pub k: f64,
}

impl DecayParams {
    pub fn half_life(&self) -> f64 {
        std::f64::consts::LN_2 / self.k
    }
}

/// Goodness-of-fit diagnostics shared by the decay and linear fits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    /// `None` when the observations have zero variance.
    pub r_squared: Option<f64>,
    pub n: usize,
}

/// A one-phase decay fit result (one entry of the fitting dictionary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayFit {
    pub params: DecayParams,
    /// One standard error per parameter, from the scaled covariance matrix.
    ///
    /// `None` when there are no residual degrees of freedom or the normal matrix
    /// is singular.
    pub std_errors: Option<DecayParams>,
    pub quality: FitQuality,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionFit {
    pub reaction: String,
    pub fit: DecayFit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionFits {
    pub condition: String,
    pub reactions: Vec<ReactionFit>,
}

impl ConditionFits {
    pub fn reaction(&self, name: &str) -> Option<&DecayFit> {
        self.reactions.iter().find(|r| r.reaction == name).map(|r| &r.fit)
    }
}

/// Per-reaction decay fits for a whole data set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FitSet {
    pub conditions: Vec<ConditionFits>,
}

impl FitSet {
    pub fn condition(&self, name: &str) -> Option<&ConditionFits> {
        self.conditions.iter().find(|c| c.condition == name)
    }

    pub fn get(&self, condition: &str, reaction: &str) -> Option<&DecayFit> {
        self.condition(condition)?.reaction(reaction)
    }
}

/// Cross-replicate statistics for one condition, one row per time point.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedTable {
    pub condition: String,
    pub time: Vec<f64>,
    pub mean: Vec<f64>,
    /// Sample standard deviation (n - 1 denominator); NaN with fewer than two replicates.
    pub sd: Vec<f64>,
    pub sem: Vec<f64>,
    /// `max - min` across replicates.
    pub range: Vec<f64>,
    /// Number of finite replicate values contributing to each row.
    pub n: Vec<usize>,
}

impl AveragedTable {
    pub const COLUMNS: [&'static str; 6] = [TIME_COLUMN, "Mean", "SD", "SEM", "Range", "N"];

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Look up a numeric column by its label (exact match).
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        match name {
            TIME_COLUMN => Some(self.time.clone()),
            "Mean" => Some(self.mean.clone()),
            "SD" => Some(self.sd.clone()),
            "SEM" => Some(self.sem.clone()),
            "Range" => Some(self.range.clone()),
            "N" => Some(self.n.iter().map(|&v| v as f64).collect()),
            _ => None,
        }
    }

    /// `(time, mean)` pairs with both values finite.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.time
            .iter()
            .zip(self.mean.iter())
            .filter(|(t, y)| t.is_finite() && y.is_finite())
            .map(|(&t, &y)| (t, y))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AveragedSet {
    pub conditions: Vec<AveragedTable>,
}

impl AveragedSet {
    pub fn condition(&self, name: &str) -> Option<&AveragedTable> {
        self.conditions.iter().find(|c| c.condition == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionFit {
    pub condition: String,
    pub fit: DecayFit,
}

/// Decay fits of the cross-replicate mean, keyed by condition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AveragedFits {
    pub conditions: Vec<ConditionFit>,
}

impl AveragedFits {
    pub fn condition(&self, name: &str) -> Option<&DecayFit> {
        self.conditions.iter().find(|c| c.condition == name).map(|c| &c.fit)
    }
}

/// Straight-line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// `None` with only two points.
    pub slope_err: Option<f64>,
    pub intercept_err: Option<f64>,
    pub quality: FitQuality,
}

/// Initial folding rate of one reaction, with the points it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitRate {
    pub fit: LinearFit,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl InitRate {
    pub fn slope(&self) -> f64 {
        self.fit.slope
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRate {
    pub reaction: String,
    pub rate: InitRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRates {
    pub condition: String,
    pub reactions: Vec<ReactionRate>,
}

impl ConditionRates {
    pub fn reaction(&self, name: &str) -> Option<&InitRate> {
        self.reactions.iter().find(|r| r.reaction == name).map(|r| &r.rate)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InitRateSet {
    pub conditions: Vec<ConditionRates>,
}

impl InitRateSet {
    pub fn condition(&self, name: &str) -> Option<&ConditionRates> {
        self.conditions.iter().find(|c| c.condition == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRate {
    pub reaction: String,
    /// Initial rate as a percentage of the control condition's mean.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNormalized {
    pub condition: String,
    pub reactions: Vec<NormalizedRate>,
}

/// Initial rates normalized to a control condition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRates {
    pub control: String,
    pub control_mean_slope: f64,
    pub conditions: Vec<ConditionNormalized>,
}

impl NormalizedRates {
    pub fn get(&self, condition: &str, reaction: &str) -> Option<f64> {
        self.conditions
            .iter()
            .find(|c| c.condition == condition)?
            .reactions
            .iter()
            .find(|r| r.reaction == reaction)
            .map(|r| r.percent)
    }
}

/// Options for the nonlinear one-phase decay fitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Smallest rate constant on the seeding grid (s⁻¹).
    pub rate_min: f64,
    /// Largest rate constant on the seeding grid (s⁻¹).
    pub rate_max: f64,
    pub rate_steps: usize,
    /// Levenberg–Marquardt iteration cap.
    pub max_iterations: usize,
    /// Relative SSE improvement below which refinement stops.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            rate_min: 1e-6,
            rate_max: 1.0,
            rate_steps: 121,
            max_iterations: 200,
            tolerance: 1e-12,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment overrides and defaults) once
/// per invocation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub workbook: PathBuf,
    pub time_range: TimeRange,
    /// Window whose points feed the initial-rate line fit.
    pub init_window: TimeRange,
    /// Condition used as 100 % for normalized rates; `None` means the first sheet.
    pub control: Option<String>,
    pub fit: FitOptions,
}

/// Everything one analysis run produces, in pipeline order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub data: DataSet,
    pub fits: FitSet,
    pub averaged: AveragedSet,
    pub averaged_fits: AveragedFits,
    pub init_rates: InitRateSet,
    pub normalized: NormalizedRates,
}

/// Portable JSON snapshot of a run (`gkfit fit --export-json`).
///
/// Holds fit results only; the raw workbook is referenced by path, not embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub workbook: PathBuf,
    pub time_range: TimeRange,
    pub init_window: TimeRange,
    pub control: String,
    pub fits: FitSet,
    pub averaged_fits: AveragedFits,
    pub init_rates: InitRateSet,
    pub normalized: NormalizedRates,
}
