//! Workbook ingest.
//!
//! This module turns a gel-kinetics workbook into a `DataSet`:
//!
//! - one sheet per condition (sheet name = condition name)
//! - a two-row column header: row 1 names the reaction (merged cells are stored as
//!   one value followed by blanks), row 2 names the measurement
//!   (`Unfolded`, `Folded`, `Fraction folded`, summary statistics, ...)
//! - column 1 is the elapsed time in seconds, shared by every reaction on the sheet
//!
//! Only columns whose measurement label starts with `Fraction folded`
//! (case-sensitive) are kept. Groups without such a column are dropped silently;
//! a malformed header is an error that ends the run.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::domain::{ConditionData, DataSet, ReactionTable, Series, TimeRange};
use crate::error::AppError;

/// Measurement-label prefix selecting the columns to keep.
pub const FRACTION_FOLDED_PREFIX: &str = "Fraction folded";

/// Number of header rows at the top of every sheet.
const HEADER_ROWS: usize = 2;

/// Parse every sheet of a workbook, keeping rows with time inside `time_range`.
pub fn parse_raw_kinetics_workbook(path: &Path, time_range: TimeRange) -> Result<DataSet, AppError> {
    if !time_range.is_valid() {
        return Err(AppError::input(format!(
            "Invalid time range: [{}, {}].",
            time_range.min, time_range.max
        )));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::input(format!("Failed to open workbook '{}': {e}", path.display())))?;

    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(AppError::input(format!("Workbook '{}' has no sheets.", path.display())));
    }

    let mut conditions = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| AppError::input(format!("Failed to read sheet '{name}': {e}")))?;
        let condition = parse_sheet(name, range.rows(), time_range)?;
        log::info!(
            "sheet '{}': {} reaction(s), {} row(s) in window",
            condition.name,
            condition.reactions.len(),
            condition.reactions.first().map_or(0, ReactionTable::len)
        );
        conditions.push(condition);
    }

    Ok(DataSet { conditions })
}

/// Parse one sheet's rows (header rows included) into a condition.
///
/// Reactions come back sorted by name.
pub fn parse_sheet<'a, I>(name: &str, rows: I, time_range: TimeRange) -> Result<ConditionData, AppError>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut rows = rows.into_iter();
    let (Some(top), Some(second)) = (rows.next(), rows.next()) else {
        return Err(AppError::input(format!(
            "Sheet '{name}': expected a {HEADER_ROWS}-row column header."
        )));
    };

    let groups = fraction_folded_groups(name, top, second)?;

    let mut time = Vec::new();
    let mut values: BTreeMap<&str, Vec<Vec<f64>>> = groups
        .iter()
        .map(|(group, cols)| (group.as_str(), vec![Vec::new(); cols.len()]))
        .collect();

    for row in rows {
        let Some(t) = row.first().and_then(cell_f64) else {
            continue;
        };
        if !time_range.contains(t) {
            continue;
        }
        time.push(t);
        for (group, cols) in &groups {
            if let Some(series) = values.get_mut(group.as_str()) {
                for (slot, (col, _)) in series.iter_mut().zip(cols.iter()) {
                    slot.push(row.get(*col).and_then(cell_f64).unwrap_or(f64::NAN));
                }
            }
        }
    }

    let mut reactions = Vec::with_capacity(groups.len());
    for (group, cols) in &groups {
        let series = values.remove(group.as_str()).unwrap_or_default();
        let mut labelled = cols
            .iter()
            .zip(series)
            .map(|((_, label), values)| Series {
                label: label.clone(),
                values,
            });
        let Some(fraction_folded) = labelled.next() else {
            continue;
        };
        reactions.push(ReactionTable {
            name: group.clone(),
            time: time.clone(),
            fraction_folded,
            extra: labelled.collect(),
        });
    }

    Ok(ConditionData {
        name: name.to_string(),
        reactions,
    })
}

/// Map reaction name → `(column index, measurement label)` for every kept column.
fn fraction_folded_groups(
    sheet: &str,
    top: &[Data],
    second: &[Data],
) -> Result<BTreeMap<String, Vec<(usize, String)>>, AppError> {
    let time_label = second.first().map(cell_text).unwrap_or_default();
    if time_label.is_empty() {
        return Err(AppError::input(format!(
            "Sheet '{sheet}': the time column (column 1) has no label in header row 2."
        )));
    }

    let width = top.len().max(second.len());
    let mut current: Option<String> = None;
    let mut groups: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();

    for col in 1..width {
        let top_label = top.get(col).map(cell_text).unwrap_or_default();
        if !top_label.is_empty() {
            current = Some(top_label);
        }
        let label = second.get(col).map(cell_text).unwrap_or_default();

        let Some(group) = current.as_ref() else {
            if label.is_empty() {
                continue;
            }
            return Err(AppError::input(format!(
                "Sheet '{sheet}': column {} ('{label}') has no reaction name in header row 1.",
                col + 1
            )));
        };

        if label.starts_with(FRACTION_FOLDED_PREFIX) {
            groups.entry(group.clone()).or_default().push((col, label));
        }
    }

    Ok(groups)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_f64(cell: &Data) -> Option<f64> {
    let v = match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn f(v: f64) -> Data {
        Data::Float(v)
    }

    fn parse(rows: &[Vec<Data>], range: TimeRange) -> Result<ConditionData, AppError> {
        parse_sheet("WT", rows.iter().map(Vec::as_slice), range)
    }

    /// Two replicates with merged top-level cells and a summary group.
    fn sheet() -> Vec<Vec<Data>> {
        vec![
            vec![Data::Empty, s("Rep2"), Data::Empty, Data::Empty, s("Rep1"), Data::Empty, Data::Empty, s("Summary"), Data::Empty],
            vec![s("Time (s)"), s("Unfolded"), s("Folded"), s("Fraction folded"), s("Unfolded"), s("Folded"), s("Fraction folded"), s("Average"), s("Range")],
            vec![f(0.0), f(100.0), f(0.0), f(0.0), f(90.0), f(10.0), f(0.1), f(0.05), f(0.1)],
            vec![f(60.0), f(60.0), f(40.0), f(0.4), f(50.0), f(50.0), f(0.5), f(0.45), f(0.1)],
            vec![f(20_000.0), f(5.0), f(95.0), f(0.95), f(4.0), f(96.0), f(0.96), f(0.955), f(0.01)],
        ]
    }

    #[test]
    fn keeps_only_fraction_folded_columns() {
        let condition = parse(&sheet(), TimeRange::default()).unwrap();
        let names: Vec<&str> = condition.reactions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Rep1", "Rep2"]);
        for r in &condition.reactions {
            assert!(r.extra.is_empty());
            assert_eq!(r.column_labels(), vec!["Time (s)", "Fraction folded"]);
        }
        assert_eq!(condition.reaction("Rep2").unwrap().fraction_folded.values, vec![0.0, 0.4]);
        assert_eq!(condition.reaction("Rep1").unwrap().fraction_folded.values, vec![0.1, 0.5]);
    }

    #[test]
    fn time_window_is_inclusive() {
        let condition = parse(&sheet(), TimeRange::new(0.0, 60.0)).unwrap();
        assert_eq!(condition.reactions[0].time, vec![0.0, 60.0]);

        let condition = parse(&sheet(), TimeRange::new(0.5, 59.9)).unwrap();
        assert!(condition.reactions[0].is_empty());
    }

    #[test]
    fn drops_row_beyond_three_hours() {
        let rows = vec![
            vec![Data::Empty, s("Rep1")],
            vec![s("Time (s)"), s("Fraction folded")],
            vec![f(0.0), f(0.0)],
            vec![f(10.0), f(0.5)],
            vec![f(20.0), f(0.9)],
            vec![f(10_900.0), f(0.99)],
        ];
        let condition = parse(&rows, TimeRange::new(0.0, 10_800.0)).unwrap();
        let rep1 = condition.reaction("Rep1").unwrap();
        assert_eq!(rep1.len(), 3);
        assert_eq!(rep1.time, vec![0.0, 10.0, 20.0]);
        assert_eq!(rep1.fraction_folded.values, vec![0.0, 0.5, 0.9]);
    }

    #[test]
    fn sheet_without_fraction_folded_is_empty_not_error() {
        let rows = vec![
            vec![Data::Empty, s("Rep1"), Data::Empty],
            vec![s("Time (s)"), s("Unfolded"), s("Folded")],
            vec![f(0.0), f(1.0), f(0.0)],
        ];
        let condition = parse(&rows, TimeRange::default()).unwrap();
        assert_eq!(condition.name, "WT");
        assert!(condition.reactions.is_empty());
    }

    #[test]
    fn prefix_match_is_case_sensitive_and_keeps_variants() {
        let rows = vec![
            vec![Data::Empty, s("Rep1"), Data::Empty, Data::Empty],
            vec![s("Time (s)"), s("fraction folded"), s("Fraction folded"), s("Fraction folded (corr.)")],
            vec![f(0.0), f(9.0), f(0.1), f(0.2)],
        ];
        let condition = parse(&rows, TimeRange::default()).unwrap();
        let rep1 = condition.reaction("Rep1").unwrap();
        assert_eq!(rep1.fraction_folded.label, "Fraction folded");
        assert_eq!(rep1.extra.len(), 1);
        assert_eq!(rep1.extra[0].values, vec![0.2]);
    }

    #[test]
    fn missing_values_become_nan_and_text_numbers_parse() {
        let rows = vec![
            vec![Data::Empty, s("Rep1")],
            vec![s("Time (s)"), s("Fraction folded")],
            vec![s("30"), Data::Empty],
            vec![Data::Empty, f(0.3)],
            vec![Data::Int(60), s(" 0.5 ")],
        ];
        let condition = parse(&rows, TimeRange::default()).unwrap();
        let rep1 = condition.reaction("Rep1").unwrap();
        assert_eq!(rep1.time, vec![30.0, 60.0]);
        assert!(rep1.fraction_folded.values[0].is_nan());
        assert_eq!(rep1.fraction_folded.values[1], 0.5);
    }

    #[test]
    fn malformed_headers_are_errors() {
        let one_row = vec![vec![Data::Empty, s("Rep1")]];
        assert_eq!(parse(&one_row, TimeRange::default()).unwrap_err().exit_code(), 2);

        let no_time_label = vec![vec![Data::Empty, s("Rep1")], vec![Data::Empty, s("Fraction folded")]];
        assert!(parse(&no_time_label, TimeRange::default()).is_err());

        let no_group = vec![
            vec![Data::Empty, Data::Empty],
            vec![s("Time (s)"), s("Fraction folded")],
        ];
        let err = parse(&no_group, TimeRange::default()).unwrap_err();
        assert!(err.to_string().contains("no reaction name"), "{err}");
    }

    #[test]
    fn parsing_is_deterministic() {
        let a = parse(&sheet(), TimeRange::default()).unwrap();
        let b = parse(&sheet(), TimeRange::default()).unwrap();
        assert_eq!(a, b);
    }
}
