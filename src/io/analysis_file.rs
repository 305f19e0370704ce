//! Read/write analysis JSON files.
//!
//! The analysis JSON is the portable record of a run: fit parameters and
//! statistics for every reaction, the averaged fits, and the initial rates. It is
//! enough to redraw terminal previews (`gkfit show`) without the workbook.
//!
//! The schema is defined by `domain::AnalysisFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{AnalysisConfig, AnalysisFile, RunOutput};
use crate::error::AppError;

pub const TOOL_NAME: &str = "gkfit";

/// Build the snapshot for a finished run.
pub fn analysis_file(output: &RunOutput, config: &AnalysisConfig) -> AnalysisFile {
    AnalysisFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Utc::now(),
        workbook: config.workbook.clone(),
        time_range: config.time_range,
        init_window: config.init_window,
        control: output.normalized.control.clone(),
        fits: output.fits.clone(),
        averaged_fits: output.averaged_fits.clone(),
        init_rates: output.init_rates.clone(),
        normalized: output.normalized.clone(),
    }
}

/// Write an analysis JSON file.
pub fn write_analysis_json(path: &Path, output: &RunOutput, config: &AnalysisConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create analysis JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &analysis_file(output, config))
        .map_err(|e| AppError::input(format!("Failed to write analysis JSON: {e}")))?;
    Ok(())
}

/// Read an analysis JSON file.
pub fn read_analysis_json(path: &Path) -> Result<AnalysisFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open analysis JSON '{}': {e}", path.display())))?;
    let analysis: AnalysisFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid analysis JSON: {e}")))?;
    if analysis.tool != TOOL_NAME {
        log::warn!("analysis JSON was written by '{}', not {TOOL_NAME}", analysis.tool);
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::condition;
    use crate::analysis::{average_by_condition, fit_averaged, fit_data_set, init_rates_as_percent_control, initial_rates};
    use crate::domain::{DataSet, FitOptions, TimeRange};

    fn run() -> (RunOutput, AnalysisConfig) {
        let data = DataSet {
            conditions: vec![
                condition("WT", &[("Rep1", 1e-3), ("Rep2", 1.2e-3)]),
                condition("Mut", &[("Rep1", 4e-4)]),
            ],
        };
        let config = AnalysisConfig {
            workbook: "kinetics.xlsx".into(),
            time_range: TimeRange::default(),
            init_window: TimeRange::new(0.0, 600.0),
            control: None,
            fit: FitOptions::default(),
        };
        let fits = fit_data_set(&data, &config.fit).unwrap();
        let averaged = average_by_condition(&data).unwrap();
        let averaged_fits = fit_averaged(&averaged, &config.fit).unwrap();
        let init_rates = initial_rates(&data, config.init_window).unwrap();
        let normalized = init_rates_as_percent_control(&init_rates, "WT").unwrap();
        let output = RunOutput {
            data,
            fits,
            averaged,
            averaged_fits,
            init_rates,
            normalized,
        };
        (output, config)
    }

    #[test]
    fn round_trips_through_disk() {
        let (output, config) = run();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");

        write_analysis_json(&path, &output, &config).unwrap();
        let back = read_analysis_json(&path).unwrap();

        assert_eq!(back.tool, TOOL_NAME);
        assert_eq!(back.control, "WT");
        assert_eq!(back.init_window, config.init_window);
        // Floats come back bit-for-bit.
        assert_eq!(back.fits, output.fits);
        assert_eq!(back.averaged_fits, output.averaged_fits);
        assert_eq!(back.init_rates, output.init_rates);
        assert_eq!(back.normalized, output.normalized);
    }

    #[test]
    fn invalid_json_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_analysis_json(&path).unwrap_err().exit_code(), 2);
    }
}
