//! Formatted terminal output for a run.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{AnalysisConfig, AnalysisFile, AveragedFits, DecayFit, FitSet, InitRateSet, NormalizedRates, RunOutput};

/// Format the run header: inputs, windows, and what was parsed.
pub fn format_run_summary(config: &AnalysisConfig, output: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== gkfit - gel kinetics fit ===\n");
    out.push_str(&format!("Workbook: {}\n", config.workbook.display()));
    out.push_str(&format!(
        "Time window: [{:.0}, {:.0}] s | initial-rate window: [{:.0}, {:.0}] s\n",
        config.time_range.min, config.time_range.max, config.init_window.min, config.init_window.max
    ));
    out.push_str(&format!(
        "Conditions: {} | reactions: {} | control: {}\n",
        output.data.conditions.len(),
        output.data.reaction_count(),
        output.normalized.control
    ));
    for condition in &output.data.conditions {
        let names: Vec<&str> = condition.reactions.iter().map(|r| r.name.as_str()).collect();
        let rows = condition.reactions.first().map_or(0, |r| r.len());
        out.push_str(&format!(
            "- {:<16} rows={:<4} reactions=[{}]\n",
            truncate(&condition.name, 16),
            rows,
            names.join(", ")
        ));
    }
    out.push('\n');
    out
}

/// Per-reaction one-phase decay fits.
pub fn format_fit_table(fits: &FitSet) -> String {
    let mut out = String::from("One-phase decay fits:\n");
    out.push_str(&fit_header("condition", "reaction"));
    for c in &fits.conditions {
        for r in &c.reactions {
            out.push_str(&fit_row(&c.condition, &r.reaction, &r.fit));
        }
    }
    out
}

/// Fits of the cross-replicate means.
pub fn format_averaged_fits(fits: &AveragedFits) -> String {
    let mut out = String::from("Averaged-data fits:\n");
    out.push_str(&fit_header("condition", ""));
    for c in &fits.conditions {
        out.push_str(&fit_row(&c.condition, "", &c.fit));
    }
    out
}

/// Initial rates with their normalization to the control.
pub fn format_rate_table(rates: &InitRateSet, normalized: &NormalizedRates) -> String {
    let mut out = format!(
        "Initial rates (control {} = {:.4e} /s):\n",
        normalized.control, normalized.control_mean_slope
    );
    out.push_str(
        format!(
            "{:<16} {:<12} {:>12} {:>12} {:>8} {:>4} {:>9}\n",
            "condition", "reaction", "slope/s", "slope_err", "R2", "n", "% ctrl"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!("{:-<16} {:-<12} {:-<12} {:-<12} {:-<8} {:-<4} {:-<9}\n", "", "", "", "", "", "", "").trim_end(),
    );
    out.push('\n');
    for c in &rates.conditions {
        for r in &c.reactions {
            let fit = &r.rate.fit;
            let percent = normalized
                .get(&c.condition, &r.reaction)
                .map(|p| format!("{p:.1}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(
                format!(
                    "{:<16} {:<12} {:>12.4e} {:>12} {:>8} {:>4} {:>9}\n",
                    truncate(&c.condition, 16),
                    truncate(&r.reaction, 12),
                    fit.slope,
                    fmt_opt_e(fit.slope_err),
                    fmt_opt(fit.quality.r_squared, 4),
                    fit.quality.n,
                    percent
                )
                .trim_end(),
            );
            out.push('\n');
        }
    }
    out
}

/// Summary of a saved analysis file (`gkfit show`).
pub fn format_analysis_file(analysis: &AnalysisFile) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} analysis ===\n", analysis.tool));
    out.push_str(&format!("Generated: {}\n", analysis.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Workbook: {}\n", analysis.workbook.display()));
    out.push_str(&format!(
        "Time window: [{:.0}, {:.0}] s | initial-rate window: [{:.0}, {:.0}] s\n\n",
        analysis.time_range.min, analysis.time_range.max, analysis.init_window.min, analysis.init_window.max
    ));
    out.push_str(&format_fit_table(&analysis.fits));
    out.push('\n');
    out.push_str(&format_averaged_fits(&analysis.averaged_fits));
    out.push('\n');
    out.push_str(&format_rate_table(&analysis.init_rates, &analysis.normalized));
    out
}

fn fit_header(first: &str, second: &str) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<16} {:<12} {:>8} {:>8} {:>12} {:>12} {:>10} {:>8} {:>4}\n",
            first, second, "y0", "plateau", "k/s", "k_err", "t1/2 s", "R2", "n"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<16} {:-<12} {:-<8} {:-<8} {:-<12} {:-<12} {:-<10} {:-<8} {:-<4}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');
    out
}

fn fit_row(condition: &str, reaction: &str, fit: &DecayFit) -> String {
    let p = &fit.params;
    let mut row = format!(
        "{:<16} {:<12} {:>8.4} {:>8.4} {:>12.4e} {:>12} {:>10.1} {:>8} {:>4}",
        truncate(condition, 16),
        truncate(reaction, 12),
        p.y0,
        p.plateau,
        p.k,
        fmt_opt_e(fit.std_errors.map(|e| e.k)),
        p.half_life(),
        fmt_opt(fit.quality.r_squared, 4),
        fit.quality.n
    )
    .trim_end()
    .to_string();
    row.push('\n');
    row
}

fn fmt_opt(v: Option<f64>, digits: usize) -> String {
    v.map(|x| format!("{x:.digits$}")).unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_e(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3e}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConditionFits, DecayParams, FitQuality, ReactionFit};

    fn fit(k: f64) -> DecayFit {
        DecayFit {
            params: DecayParams { y0: 0.05, plateau: 0.9, k },
            std_errors: None,
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                r_squared: Some(1.0),
                n: 10,
            },
            iterations: 3,
        }
    }

    #[test]
    fn fit_table_rows_line_up_with_header() {
        let fits = FitSet {
            conditions: vec![ConditionFits {
                condition: "WT".to_string(),
                reactions: vec![ReactionFit {
                    reaction: "Rep1".to_string(),
                    fit: fit(1e-3),
                }],
            }],
        };
        let txt = format_fit_table(&fits);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "One-phase decay fits:");
        assert!(lines[1].starts_with("condition        reaction"));
        assert!(lines[2].starts_with("----------------"));
        assert!(lines[3].starts_with("WT               Rep1"), "{}", lines[3]);
        assert!(lines[3].contains("1.0000e-3"));
        assert!(lines[3].contains("693.1"));
        assert!(lines[3].ends_with("10"));
    }

    #[test]
    fn truncates_long_names() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
    }

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(fmt_opt(None, 4), "-");
        assert_eq!(fmt_opt(Some(0.5), 2), "0.50");
        assert_eq!(fmt_opt_e(None), "-");
    }
}
