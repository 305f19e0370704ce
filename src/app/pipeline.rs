//! Shared analysis pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! parse workbook -> per-reaction fits -> replicate averages -> averaged fits ->
//! initial rates -> normalization to the control
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::analysis::{average_by_condition, fit_averaged, fit_data_set, init_rates_as_percent_control, initial_rates};
use crate::domain::{AnalysisConfig, DataSet, RunOutput};
use crate::error::AppError;
use crate::io::parse_raw_kinetics_workbook;

/// Parse the configured workbook and run the full analysis.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    log::info!("reading {}", config.workbook.display());
    let data = parse_raw_kinetics_workbook(&config.workbook, config.time_range)?;
    run_analysis_on(data, config)
}

/// Run the analysis on an already parsed data set.
///
/// This is useful for tests and for the TUI, which re-runs fits without
/// re-reading the workbook.
pub fn run_analysis_on(data: DataSet, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    if data.reaction_count() == 0 {
        return Err(AppError::no_data(format!(
            "No 'Fraction folded' columns in '{}' within [{}, {}] s.",
            config.workbook.display(),
            config.time_range.min,
            config.time_range.max
        )));
    }

    let control = resolve_control(&data, config.control.as_deref())?;

    let fits = fit_data_set(&data, &config.fit)?;
    log::info!("fitted {} reaction(s)", data.reaction_count());

    let averaged = average_by_condition(&data)?;
    let averaged_fits = fit_averaged(&averaged, &config.fit)?;

    let init_rates = initial_rates(&data, config.init_window)?;
    let normalized = init_rates_as_percent_control(&init_rates, &control)?;
    log::debug!("control '{}' mean slope {:.4e}/s", control, normalized.control_mean_slope);

    Ok(RunOutput {
        data,
        fits,
        averaged,
        averaged_fits,
        init_rates,
        normalized,
    })
}

/// Pick the control condition: the requested one, else the first sheet with data.
pub fn resolve_control(data: &DataSet, requested: Option<&str>) -> Result<String, AppError> {
    match requested {
        Some(name) => {
            let condition = data
                .condition(name)
                .ok_or_else(|| AppError::input(format!("Control condition '{name}' is not a sheet in the workbook.")))?;
            if condition.reactions.is_empty() {
                return Err(AppError::no_data(format!("Control condition '{name}' has no 'Fraction folded' data.")));
            }
            Ok(name.to_string())
        }
        None => data
            .conditions
            .iter()
            .find(|c| !c.reactions.is_empty())
            .map(|c| c.name.clone())
            .ok_or_else(|| AppError::no_data("No condition has data to use as control.")),
    }
}
