//! Export fit and rate results as flat tables.
//!
//! Tables are built in memory first (`ExportTable`) and then serialized by file
//! extension, so the same column layout lands in CSV and XLSX alike. Column
//! order is fixed: identifiers, then fitted parameters, then derived statistics.

use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::domain::{AveragedFits, DecayFit, FitSet, InitRateSet, NormalizedRates};
use crate::error::AppError;

/// One cell of an export table. `Empty` stands for an undefined value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn number(v: f64) -> Self {
        if v.is_finite() { Cell::Number(v) } else { Cell::Empty }
    }

    fn optional(v: Option<f64>) -> Self {
        v.map_or(Cell::Empty, Cell::number)
    }

    fn text(v: &str) -> Self {
        Cell::Text(v.to_string())
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    /// Column values by name.
    #[cfg(test)]
    fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.columns.iter().position(|c| *c == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }
}

pub const FIT_COLUMNS: [&str; 13] = [
    "condition",
    "reaction",
    "y0",
    "plateau",
    "k_per_s",
    "y0_err",
    "plateau_err",
    "k_err",
    "half_life_s",
    "r_squared",
    "rmse",
    "sse",
    "n_points",
];

pub const RATE_COLUMNS: [&str; 8] = [
    "condition",
    "reaction",
    "slope_per_s",
    "intercept",
    "slope_err",
    "r_squared",
    "n_points",
    "percent_of_control",
];

fn decay_cells(fit: &DecayFit) -> Vec<Cell> {
    let p = &fit.params;
    let e = fit.std_errors.as_ref();
    vec![
        Cell::number(p.y0),
        Cell::number(p.plateau),
        Cell::number(p.k),
        Cell::optional(e.map(|e| e.y0)),
        Cell::optional(e.map(|e| e.plateau)),
        Cell::optional(e.map(|e| e.k)),
        Cell::number(p.half_life()),
        Cell::optional(fit.quality.r_squared),
        Cell::number(fit.quality.rmse),
        Cell::number(fit.quality.sse),
        Cell::Number(fit.quality.n as f64),
    ]
}

/// One row per condition and reaction of the replicate fits.
pub fn build_fit_table(fits: &FitSet) -> ExportTable {
    let mut rows = Vec::new();
    for condition in &fits.conditions {
        for reaction in &condition.reactions {
            let mut row = vec![Cell::text(&condition.condition), Cell::text(&reaction.reaction)];
            row.extend(decay_cells(&reaction.fit));
            rows.push(row);
        }
    }
    ExportTable {
        columns: FIT_COLUMNS.to_vec(),
        rows,
    }
}

/// One row per condition of the averaged-data fits.
pub fn build_averaged_fit_table(fits: &AveragedFits) -> ExportTable {
    let rows = fits
        .conditions
        .iter()
        .map(|c| {
            let mut row = vec![Cell::text(&c.condition)];
            row.extend(decay_cells(&c.fit));
            row
        })
        .collect();
    let columns = FIT_COLUMNS.iter().copied().filter(|c| *c != "reaction").collect();
    ExportTable { columns, rows }
}

/// One row per condition and reaction of the initial-rate fits.
///
/// `percent_of_control` is empty when no normalization is given or the pair is
/// missing from it.
pub fn build_rate_table(rates: &InitRateSet, normalized: Option<&NormalizedRates>) -> ExportTable {
    let mut rows = Vec::new();
    for condition in &rates.conditions {
        for reaction in &condition.reactions {
            let fit = &reaction.rate.fit;
            let percent = normalized.and_then(|n| n.get(&condition.condition, &reaction.reaction));
            rows.push(vec![
                Cell::text(&condition.condition),
                Cell::text(&reaction.reaction),
                Cell::number(fit.slope),
                Cell::number(fit.intercept),
                Cell::optional(fit.slope_err),
                Cell::optional(fit.quality.r_squared),
                Cell::Number(fit.quality.n as f64),
                Cell::optional(percent),
            ]);
        }
    }
    ExportTable {
        columns: RATE_COLUMNS.to_vec(),
        rows,
    }
}

/// Write a table as `.csv` or `.xlsx`, chosen by the path's extension.
pub fn write_table(path: &Path, table: &ExportTable) -> Result<(), AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => write_csv(path, table),
        "xlsx" => write_xlsx(path, table),
        _ => Err(AppError::input(format!(
            "Unsupported export format for '{}': use .csv or .xlsx.",
            path.display()
        ))),
    }
}

fn write_csv(path: &Path, table: &ExportTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    writer
        .write_record(&table.columns)
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::render))
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn write_xlsx(path: &Path, table: &ExportTable) -> Result<(), AppError> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| AppError::input(format!("Failed to write export XLSX: {e}"));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, *name).map_err(xlsx_err)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r, col, s.as_str()).map_err(xlsx_err)?;
                }
                Cell::Number(v) => {
                    sheet.write_number(r, col, *v).map_err(xlsx_err)?;
                }
                Cell::Empty => {}
            }
        }
    }
    workbook
        .save(path)
        .map_err(|e| AppError::input(format!("Failed to save export XLSX '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConditionFit, ConditionFits, ConditionNormalized, ConditionRates, DecayParams, FitQuality, InitRate,
        LinearFit, NormalizedRate, ReactionFit, ReactionRate,
    };

    fn decay(k: f64, with_errors: bool) -> DecayFit {
        DecayFit {
            params: DecayParams { y0: 0.0, plateau: 0.9, k },
            std_errors: with_errors.then_some(DecayParams {
                y0: 0.01,
                plateau: 0.02,
                k: 1e-5,
            }),
            quality: FitQuality {
                sse: 0.001,
                rmse: 0.01,
                r_squared: Some(0.99),
                n: 10,
            },
            iterations: 4,
        }
    }

    fn fits() -> FitSet {
        FitSet {
            conditions: vec![ConditionFits {
                condition: "WT".to_string(),
                reactions: vec![
                    ReactionFit {
                        reaction: "Rep1".to_string(),
                        fit: decay(1e-3, true),
                    },
                    ReactionFit {
                        reaction: "Rep2".to_string(),
                        fit: decay(2e-3, false),
                    },
                ],
            }],
        }
    }

    fn rates() -> InitRateSet {
        let line = LinearFit {
            slope: 1e-3,
            intercept: 0.0,
            slope_err: None,
            intercept_err: None,
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                r_squared: Some(1.0),
                n: 2,
            },
        };
        InitRateSet {
            conditions: vec![ConditionRates {
                condition: "WT".to_string(),
                reactions: vec![ReactionRate {
                    reaction: "Rep1".to_string(),
                    rate: InitRate {
                        fit: line,
                        x: vec![0.0, 60.0],
                        y: vec![0.0, 0.06],
                    },
                }],
            }],
        }
    }

    #[test]
    fn fit_table_has_fixed_column_order() {
        let table = build_fit_table(&fits());
        assert_eq!(table.columns[..5], ["condition", "reaction", "y0", "plateau", "k_per_s"]);
        assert_eq!(table.columns.last(), Some(&"n_points"));
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|r| r.len() == table.columns.len()));
        assert_eq!(table.rows[0][0], Cell::Text("WT".to_string()));
        assert_eq!(table.rows[1][1], Cell::Text("Rep2".to_string()));
    }

    #[test]
    fn missing_standard_errors_are_empty_cells() {
        let table = build_fit_table(&fits());
        let k_err = table.column("k_err").unwrap();
        assert_eq!(*k_err[0], Cell::Number(1e-5));
        assert_eq!(*k_err[1], Cell::Empty);

        let half_life = table.column("half_life_s").unwrap();
        assert_eq!(*half_life[0], Cell::Number(std::f64::consts::LN_2 / 1e-3));
    }

    #[test]
    fn averaged_table_drops_reaction_column() {
        let averaged = AveragedFits {
            conditions: vec![ConditionFit {
                condition: "WT".to_string(),
                fit: decay(1e-3, true),
            }],
        };
        let table = build_averaged_fit_table(&averaged);
        assert_eq!(table.columns.len(), FIT_COLUMNS.len() - 1);
        assert!(!table.columns.contains(&"reaction"));
        assert_eq!(table.rows[0].len(), table.columns.len());
    }

    #[test]
    fn rate_table_fills_percent_when_normalized() {
        let plain = build_rate_table(&rates(), None);
        assert_eq!(*plain.column("percent_of_control").unwrap()[0], Cell::Empty);

        let normalized = NormalizedRates {
            control: "WT".to_string(),
            control_mean_slope: 1e-3,
            conditions: vec![ConditionNormalized {
                condition: "WT".to_string(),
                reactions: vec![NormalizedRate {
                    reaction: "Rep1".to_string(),
                    percent: 100.0,
                }],
            }],
        };
        let table = build_rate_table(&rates(), Some(&normalized));
        assert_eq!(table.columns, RATE_COLUMNS.to_vec());
        assert_eq!(*table.column("percent_of_control").unwrap()[0], Cell::Number(100.0));
        assert_eq!(*table.column("slope_err").unwrap()[0], Cell::Empty);
    }

    #[test]
    fn writes_csv_with_blank_undefined_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fits.csv");
        write_table(&path, &build_fit_table(&fits())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(FIT_COLUMNS.join(",").as_str()));
        let rep2 = lines.nth(1).unwrap();
        assert!(rep2.starts_with("WT,Rep2,0,0.9,0.002,,,,"), "{rep2}");
    }

    #[test]
    fn writes_xlsx_and_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("fits.xlsx");
        write_table(&xlsx, &build_fit_table(&fits())).unwrap();
        assert!(xlsx.exists());

        let err = write_table(&dir.path().join("fits.txt"), &build_fit_table(&fits())).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
