//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the workbook (argument or picker)
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional exports and figures

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{AnalysisArgs, Command, FiguresArgs, FitArgs, LegendArg, ShowArgs, SimulateArgs};
use crate::data::sample::{SimulationConfig, simulate_workbook, write_workbook};
use crate::domain::{AnalysisConfig, FitOptions, RunOutput, TimeRange};
use crate::error::AppError;
use crate::io::{
    build_averaged_fit_table, build_fit_table, build_rate_table, read_analysis_json, write_analysis_json,
    write_table,
};
use crate::plot::{
    AveragedPlotOptions, FigureStyle, InitRatePlotOptions, LegendPlacement, NormRatePlotOptions, Palette,
    RawFitPlotOptions, plot_averaged_with_fits, plot_fraction_folded_and_fits, plot_init_rate_fits,
    plot_norm_init_rates, render_ascii_curve, render_ascii_plot, render_rate_bars,
};

pub mod pipeline;

/// Entry point for the `gkfit` binary.
pub fn run() -> Result<(), AppError> {
    // We want `gkfit` and `gkfit --control WT` to behave like `gkfit view ...`,
    // and `gkfit data.xlsx` like `gkfit fit data.xlsx`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Figures(args) => handle_figures(args),
        Command::Show(args) => handle_show(args),
        Command::View(args) => crate::tui::run(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.analysis, resolve_workbook(&args.analysis)?)?;
    let run = pipeline::run_analysis(&config)?;

    println!("{}", crate::report::format_run_summary(&config, &run));
    println!("{}", crate::report::format_fit_table(&run.fits));
    println!("{}", crate::report::format_averaged_fits(&run.averaged_fits));
    println!("{}", crate::report::format_rate_table(&run.init_rates, &run.normalized));

    if !args.no_plot {
        print_previews(&run, args.width, args.height);
    }

    // Optional exports.
    if let Some(path) = &args.export {
        write_table(path, &build_fit_table(&run.fits))?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.export_averaged {
        write_table(path, &build_averaged_fit_table(&run.averaged_fits))?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.export_rates {
        write_table(path, &build_rate_table(&run.init_rates, Some(&run.normalized)))?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.export_json {
        write_analysis_json(path, &run, &config)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn print_previews(run: &RunOutput, width: usize, height: usize) {
    for table in &run.averaged.conditions {
        let Some(fit) = run.averaged_fits.condition(&table.condition) else {
            continue;
        };
        println!("{} (mean of replicates):", table.condition);
        println!("{}", render_ascii_plot(&table.points(), fit, width, height));
    }
    println!("{}", render_rate_bars(&run.normalized, width.saturating_sub(30)));
}

fn handle_figures(args: FiguresArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.analysis, resolve_workbook(&args.analysis)?)?;
    let run = pipeline::run_analysis(&config)?;

    std::fs::create_dir_all(&args.out_dir).map_err(|e| {
        AppError::input(format!("Failed to create output directory '{}': {e}", args.out_dir.display()))
    })?;

    let style = FigureStyle {
        dpi: args.dpi,
        opaque: args.opaque,
        palette: Palette::parse(&args.palette)?,
        ..FigureStyle::default()
    };
    let out = |name: String| args.out_dir.join(name);
    let mut written = Vec::new();

    let names: Vec<&str> = run.data.conditions.iter().map(|c| c.name.as_str()).collect();
    let stems = unique_file_stems(&names);
    for (condition, stem) in run.data.conditions.iter().zip(&stems) {
        if condition.reactions.is_empty() {
            continue;
        }
        if let Some(fits) = run.fits.condition(&condition.name) {
            let options = RawFitPlotOptions {
                style: style.clone(),
                title: None,
                save: Some(out(format!("raw_{stem}.svg"))),
            };
            written.extend(plot_fraction_folded_and_fits(condition, fits, &options)?.saved);
        }
        if let Some(rates) = run.init_rates.condition(&condition.name) {
            let options = InitRatePlotOptions {
                style: style.clone(),
                title: None,
                save: Some(out(format!("init_rates_{stem}.svg"))),
            };
            written.extend(plot_init_rate_fits(rates, &options)?.saved);
        }
    }

    let (width_in, height_in) = flag_pair(&args.fig_size, "--fig-size")?;
    let averaged = AveragedPlotOptions {
        style: FigureStyle {
            width_in,
            height_in,
            ..style.clone()
        },
        y_limits: flag_pair(&args.y_limits, "--y-limits")?,
        error_bars: args.error_bars.clone(),
        legend: match args.legend {
            LegendArg::Inside => LegendPlacement::Inside,
            LegendArg::Outside => LegendPlacement::Outside,
        },
        save: Some(out("averaged.svg".to_string())),
    };
    written.extend(plot_averaged_with_fits(&run.averaged, &run.averaged_fits, &averaged)?.saved);

    let norm_defaults = NormRatePlotOptions::default();
    let norm = NormRatePlotOptions {
        style: FigureStyle {
            dpi: args.dpi,
            opaque: args.opaque,
            palette: style.palette.clone(),
            ..norm_defaults.style.clone()
        },
        y_limits: (0.0, args.rate_y_max),
        y_label: format!("Normalised initial folding rate (% of mean {})", run.normalized.control),
        save: Some(out("normalized_rates.svg".to_string())),
        ..norm_defaults
    };
    written.extend(plot_norm_init_rates(&run.normalized, &norm)?.saved);

    for path in &written {
        println!("{}", path.display());
    }
    log::info!("wrote {} figure(s) to {}", written.len(), args.out_dir.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let analysis = read_analysis_json(&args.analysis)?;
    println!("{}", crate::report::format_analysis_file(&analysis));

    if !args.no_plot {
        for c in &analysis.averaged_fits.conditions {
            println!("{} (averaged fit):", c.condition);
            println!(
                "{}",
                render_ascii_curve(
                    &c.fit,
                    analysis.time_range.min,
                    analysis.time_range.max,
                    args.width,
                    args.height
                )
            );
        }
        println!("{}", render_rate_bars(&analysis.normalized, args.width.saturating_sub(30)));
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = SimulationConfig {
        replicates: args.replicates,
        seed: args.seed,
        noise_sd: args.noise,
        ..SimulationConfig::default()
    };
    let sheets = simulate_workbook(&config)?;
    write_workbook(&args.out, &sheets)?;
    println!("{}", args.out.display());
    Ok(())
}

/// Two comma-separated numbers from a flag such as `--y-limits 0,1`.
fn flag_pair(values: &[f64], flag: &str) -> Result<(f64, f64), AppError> {
    match values {
        [a, b] => Ok((*a, *b)),
        _ => Err(AppError::input(format!("{flag} takes exactly two comma-separated numbers."))),
    }
}

pub(crate) fn resolve_workbook(args: &AnalysisArgs) -> Result<PathBuf, AppError> {
    match &args.workbook {
        Some(path) => crate::cli::picker::validate_workbook_path(path),
        None => crate::cli::picker::prompt_for_workbook_path(),
    }
}

pub fn analysis_config_from_args(args: &AnalysisArgs, workbook: PathBuf) -> Result<AnalysisConfig, AppError> {
    let time_range = TimeRange::new(args.time_min, args.time_max);
    if !time_range.is_valid() {
        return Err(AppError::input(format!(
            "Invalid time window [{}, {}] s.",
            args.time_min, args.time_max
        )));
    }
    let init_window = TimeRange::new(args.init_window_min, args.init_window_max);
    if !init_window.is_valid() {
        return Err(AppError::input(format!(
            "Invalid initial-rate window [{}, {}] s.",
            args.init_window_min, args.init_window_max
        )));
    }

    Ok(AnalysisConfig {
        workbook,
        time_range,
        init_window,
        control: args.control.clone().filter(|c| !c.trim().is_empty()),
        fit: FitOptions {
            rate_min: args.rate_min,
            rate_max: args.rate_max,
            rate_steps: args.rate_steps,
            max_iterations: args.max_iterations,
            ..FitOptions::default()
        },
    })
}

/// Make a condition name safe to use in a file name.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if stem.is_empty() { "condition".to_string() } else { stem }
}

/// File stems for a list of names, with `_2`, `_3`, ... appended where two
/// names sanitize to the same stem.
fn unique_file_stems(names: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|name| {
            let base = file_stem(name);
            let mut stem = base.clone();
            let mut n = 2;
            while !seen.insert(stem.to_ascii_lowercase()) {
                stem = format!("{base}_{n}");
                n += 1;
            }
            stem
        })
        .collect()
}

/// Rewrite argv so `gkfit` defaults to `gkfit view`.
///
/// Rules:
/// - `gkfit`                         -> `gkfit view`
/// - `gkfit --control WT ...`        -> `gkfit view --control WT ...`
/// - `gkfit data.xlsx ...`           -> `gkfit fit data.xlsx ...`
/// - `gkfit --help/--version/-h`     -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("view".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "figures" | "show" | "view" | "simulate");
    if is_subcommand {
        return argv;
    }

    // A leading flag means "view flags".
    if arg1.starts_with('-') {
        argv.insert(1, "view".to_string());
        return argv;
    }

    // Anything else is taken as a workbook path.
    argv.insert(1, "fit".to_string());
    argv
}
