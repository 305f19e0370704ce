use std::fs;

use gel_kinetics_fit::app::pipeline::run_analysis;
use gel_kinetics_fit::data::sample::{SimulationConfig, simulate_workbook, write_workbook};
use gel_kinetics_fit::domain::{AnalysisConfig, FitOptions, TimeRange};
use gel_kinetics_fit::io::{
    build_fit_table, build_rate_table, parse_raw_kinetics_workbook, read_analysis_json, write_analysis_json,
    write_table,
};
use gel_kinetics_fit::plot::{
    AveragedPlotOptions, MISSING_ERROR_BARS_WARNING, RawFitPlotOptions, plot_averaged_with_fits,
    plot_fraction_folded_and_fits,
};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

fn config(workbook: std::path::PathBuf) -> AnalysisConfig {
    AnalysisConfig {
        workbook,
        time_range: TimeRange::default(),
        init_window: TimeRange::new(0.0, 600.0),
        control: None,
        fit: FitOptions::default(),
    }
}

#[test]
fn window_drops_rows_past_three_hours() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("single.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("WT").unwrap();
    sheet.write_string(0, 1, "Rep1").unwrap();
    sheet.write_string(1, 0, "Time (s)").unwrap();
    sheet.write_string(1, 1, "Fraction folded").unwrap();
    for (i, (t, y)) in [(0.0, 0.0), (10.0, 0.5), (20.0, 0.9), (10_900.0, 0.99)].into_iter().enumerate() {
        let row = i as u32 + 2;
        sheet.write_number(row, 0, t).unwrap();
        sheet.write_number(row, 1, y).unwrap();
    }
    workbook.save(&path).unwrap();

    let data = parse_raw_kinetics_workbook(&path, TimeRange::new(0.0, 10_800.0)).unwrap();
    let wt = data.condition("WT").unwrap();
    assert_eq!(wt.reactions.len(), 1);
    assert_eq!(wt.reactions[0].time, vec![0.0, 10.0, 20.0]);
    assert_eq!(wt.reactions[0].fraction_folded.values, vec![0.0, 0.5, 0.9]);
}

#[test]
fn simulated_workbook_runs_end_to_end() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("kinetics.xlsx");
    let sheets = simulate_workbook(&SimulationConfig::default()).unwrap();
    write_workbook(&path, &sheets).unwrap();

    let config = config(path.clone());
    let run = run_analysis(&config).unwrap();

    let names: Vec<&str> = run.data.conditions.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["WT", "Mut-A", "Mut-B"]);
    assert_eq!(run.data.reaction_count(), 9);
    assert_eq!(run.normalized.control, "WT");

    // Simulated rate constants are ordered WT > Mut-A > Mut-B.
    let k = |c: &str| run.averaged_fits.condition(c).unwrap().params.k;
    assert!(k("WT") > k("Mut-A"));
    assert!(k("Mut-A") > k("Mut-B"));
    let wt_k = k("WT");
    assert!((wt_k - 1.2e-3).abs() / 1.2e-3 < 0.3, "k={wt_k}");

    let control_mean: f64 = run.normalized.conditions[0].reactions.iter().map(|r| r.percent).sum::<f64>() / 3.0;
    assert!((control_mean - 100.0).abs() < 1e-9);

    // Re-reading the same file is deterministic.
    assert_eq!(run_analysis(&config).unwrap(), run);

    let fits_csv = tmp.path().join("fits.csv");
    write_table(&fits_csv, &build_fit_table(&run.fits)).unwrap();
    let text = fs::read_to_string(&fits_csv).unwrap();
    assert!(text.starts_with("condition,reaction,y0,plateau,k_per_s"));
    assert_eq!(text.lines().count(), 10);

    let rates_xlsx = tmp.path().join("rates.xlsx");
    write_table(&rates_xlsx, &build_rate_table(&run.init_rates, Some(&run.normalized))).unwrap();
    assert!(fs::metadata(&rates_xlsx).unwrap().len() > 0);

    let json = tmp.path().join("analysis.json");
    write_analysis_json(&json, &run, &config).unwrap();
    let file = read_analysis_json(&json).unwrap();
    assert_eq!(file.fits, run.fits);
    assert_eq!(file.normalized, run.normalized);
    assert_eq!(file.workbook, path);
}

#[test]
fn figures_are_written_for_a_simulated_run() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("kinetics.xlsx");
    write_workbook(&path, &simulate_workbook(&SimulationConfig::default()).unwrap()).unwrap();
    let run = run_analysis(&config(path)).unwrap();

    let raw_svg = tmp.path().join("raw_WT.svg");
    let options = RawFitPlotOptions {
        save: Some(raw_svg.clone()),
        ..RawFitPlotOptions::default()
    };
    let figure =
        plot_fraction_folded_and_fits(run.data.condition("WT").unwrap(), run.fits.condition("WT").unwrap(), &options)
            .unwrap();
    assert!(figure.warnings.is_empty());
    assert!(fs::read_to_string(&raw_svg).unwrap().contains("Rep3"));

    let options = AveragedPlotOptions {
        error_bars: Some("Range".to_string()),
        ..AveragedPlotOptions::default()
    };
    let figure = plot_averaged_with_fits(&run.averaged, &run.averaged_fits, &options).unwrap();
    assert!(figure.warnings.is_empty());
    assert!(figure.svg.contains("Mut-B"));
}

#[test]
fn sheet_without_fraction_folded_is_an_empty_condition() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("mixed.xlsx");
    let times = [0.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 3600.0];

    let mut workbook = Workbook::new();
    let wt = workbook.add_worksheet();
    wt.set_name("WT").unwrap();
    wt.write_string(1, 0, "Time (s)").unwrap();
    for (rep, k) in [(0u16, 1e-3_f64), (1, 1.3e-3)] {
        let col = 1 + rep * 2;
        wt.write_string(0, col, format!("Rep{}", rep + 1)).unwrap();
        wt.write_string(1, col, "Folded").unwrap();
        wt.write_string(1, col + 1, "Fraction folded").unwrap();
        for (i, &t) in times.iter().enumerate() {
            let y = 0.9 * (1.0 - (-k * t).exp());
            let row = i as u32 + 2;
            wt.write_number(row, 0, t).unwrap();
            wt.write_number(row, col, (y * 1e4).round()).unwrap();
            wt.write_number(row, col + 1, y).unwrap();
        }
    }

    let blank = workbook.add_worksheet();
    blank.set_name("Blank").unwrap();
    blank.write_string(0, 1, "Rep1").unwrap();
    blank.write_string(1, 0, "Time (s)").unwrap();
    blank.write_string(1, 1, "Unfolded").unwrap();
    blank.write_string(1, 2, "Folded").unwrap();
    for (i, &t) in times.iter().enumerate() {
        let row = i as u32 + 2;
        blank.write_number(row, 0, t).unwrap();
        blank.write_number(row, 1, 5000.0).unwrap();
        blank.write_number(row, 2, 5000.0).unwrap();
    }
    workbook.save(&path).unwrap();

    let data = parse_raw_kinetics_workbook(&path, TimeRange::default()).unwrap();
    let names: Vec<&str> = data.conditions.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["WT", "Blank"]);
    assert!(data.condition("Blank").unwrap().reactions.is_empty());
    let wt = data.condition("WT").unwrap();
    assert_eq!(wt.reactions.len(), 2);
    assert!(wt.reactions.iter().all(|r| r.extra.is_empty() && r.len() == times.len()));

    // The empty condition flows through the pipeline and the averaged plot.
    let run = run_analysis(&config(path)).unwrap();
    assert!(run.averaged_fits.condition("Blank").is_none());

    let options = AveragedPlotOptions {
        error_bars: Some("Stdev".to_string()),
        ..AveragedPlotOptions::default()
    };
    let figure = plot_averaged_with_fits(&run.averaged, &run.averaged_fits, &options).unwrap();
    assert_eq!(figure.warnings[0], MISSING_ERROR_BARS_WARNING);
    assert!(figure.warnings.iter().any(|w| w.contains("'Blank'")));
    assert!(figure.svg.contains("WT"));
}
