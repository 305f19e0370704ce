//! Command-line parsing for the gel-kinetics fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code. Analysis flags can also be set through
//! `GKFIT_*` environment variables (or a `.env` file).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gkfit", version, about = "Gel-kinetics fraction-folded fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every reaction, average replicates, compute initial rates; print and optionally export.
    Fit(FitArgs),
    /// Write SVG figures for a workbook.
    Figures(FiguresArgs),
    /// Print a previously exported analysis JSON.
    Show(ShowArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `gkfit fit`, but renders results
    /// in a terminal UI using Ratatui.
    View(AnalysisArgs),
    /// Write a synthetic workbook in the expected input layout.
    Simulate(SimulateArgs),
}

/// Options shared by every command that analyses a workbook.
#[derive(Debug, Parser, Clone)]
pub struct AnalysisArgs {
    /// Workbook to analyse (.xlsx, .xls, .ods). Prompts for one when omitted.
    #[arg(value_name = "WORKBOOK")]
    pub workbook: Option<PathBuf>,

    /// Earliest time point kept (seconds, inclusive).
    #[arg(long, env = "GKFIT_TIME_MIN", default_value_t = 0.0)]
    pub time_min: f64,

    /// Latest time point kept (seconds, inclusive).
    #[arg(long, env = "GKFIT_TIME_MAX", default_value_t = 10_800.0)]
    pub time_max: f64,

    /// Start of the initial-rate window (seconds, inclusive).
    #[arg(long, default_value_t = 0.0)]
    pub init_window_min: f64,

    /// End of the initial-rate window (seconds, inclusive).
    #[arg(long, env = "GKFIT_INIT_WINDOW_MAX", default_value_t = 600.0)]
    pub init_window_max: f64,

    /// Condition (sheet) whose mean initial rate is 100 %. Defaults to the first sheet with data.
    #[arg(long, env = "GKFIT_CONTROL")]
    pub control: Option<String>,

    /// Smallest rate constant on the seeding grid (s⁻¹).
    #[arg(long, default_value_t = 1e-6)]
    pub rate_min: f64,

    /// Largest rate constant on the seeding grid (s⁻¹).
    #[arg(long, default_value_t = 1.0)]
    pub rate_max: f64,

    /// Number of log-spaced rate constants on the seeding grid.
    #[arg(long, default_value_t = 121)]
    pub rate_steps: usize,

    /// Levenberg–Marquardt iteration cap.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,
}

/// Options for `gkfit fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-reaction fits (.csv or .xlsx).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export averaged-data fits (.csv or .xlsx).
    #[arg(long = "export-averaged")]
    pub export_averaged: Option<PathBuf>,

    /// Export initial rates with percent of control (.csv or .xlsx).
    #[arg(long = "export-rates")]
    pub export_rates: Option<PathBuf>,

    /// Export the full analysis as JSON (readable by `gkfit show`).
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Legend layout for the averaged figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LegendArg {
    /// Legend fits inside the requested figure size.
    Inside,
    /// Legend is added to the right of the requested figure size.
    Outside,
}

/// Options for `gkfit figures`.
#[derive(Debug, Parser, Clone)]
pub struct FiguresArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Directory the SVG files are written to (created if missing).
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Canvas resolution (pixels per inch).
    #[arg(long, default_value_t = 600)]
    pub dpi: u32,

    /// Averaged-table column used for error bars (Range, SD, SEM).
    #[arg(long, default_value = "Range")]
    pub error_bars: Option<String>,

    /// Legend placement for the averaged figure.
    #[arg(long, value_enum, default_value_t = LegendArg::Outside)]
    pub legend: LegendArg,

    /// Colour palette: tab10, tab20, or comma-separated hex colours.
    #[arg(long, default_value = "tab20")]
    pub palette: String,

    /// Paint a white background instead of leaving it transparent.
    #[arg(long)]
    pub opaque: bool,

    /// Y-axis limits of the averaged figure, as `MIN,MAX`.
    #[arg(long, value_name = "MIN,MAX", value_delimiter = ',', default_values_t = [0.0, 1.0], allow_negative_numbers = true)]
    pub y_limits: Vec<f64>,

    /// Size of the averaged figure in inches, as `WIDTH,HEIGHT`.
    #[arg(long, value_name = "W,H", value_delimiter = ',', default_values_t = [5.0, 6.0])]
    pub fig_size: Vec<f64>,

    /// Y-axis upper limit for the normalized-rate figure (percent).
    #[arg(long, default_value_t = 200.0)]
    pub rate_y_max: f64,
}

/// Options for printing a saved analysis.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Analysis JSON produced by `gkfit fit --export-json`.
    #[arg(long, value_name = "JSON")]
    pub analysis: PathBuf,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for `gkfit simulate`.
#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Output workbook (.xlsx).
    #[arg(long, value_name = "XLSX")]
    pub out: PathBuf,

    /// Replicates per condition.
    #[arg(long, default_value_t = 3)]
    pub replicates: usize,

    /// Random seed.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Standard deviation of the noise added to the fraction folded.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,
}
