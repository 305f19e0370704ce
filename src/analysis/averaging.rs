//! Cross-replicate averaging within each condition.

use crate::domain::{AveragedSet, AveragedTable, ConditionData, DataSet};
use crate::error::AppError;
use crate::math::{mean, range, sample_sd, sem};

/// Average the primary "Fraction folded" series of every condition's reactions
/// row by row.
///
/// Reactions of one condition come from one sheet, so their time columns must be
/// identical; anything else is reported as an error rather than silently
/// misaligned.
pub fn average_by_condition(data: &DataSet) -> Result<AveragedSet, AppError> {
    let conditions = data
        .conditions
        .iter()
        .map(average_condition)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AveragedSet { conditions })
}

fn average_condition(condition: &ConditionData) -> Result<AveragedTable, AppError> {
    let mut table = AveragedTable {
        condition: condition.name.clone(),
        time: Vec::new(),
        mean: Vec::new(),
        sd: Vec::new(),
        sem: Vec::new(),
        range: Vec::new(),
        n: Vec::new(),
    };

    let Some(first) = condition.reactions.first() else {
        return Ok(table);
    };

    for reaction in &condition.reactions[1..] {
        if !same_time_column(&first.time, &reaction.time) {
            return Err(AppError::input(format!(
                "Reactions '{}' and '{}' in condition '{}' do not share a time column.",
                first.name, reaction.name, condition.name
            )));
        }
    }

    for (row, &t) in first.time.iter().enumerate() {
        let values: Vec<f64> = condition
            .reactions
            .iter()
            .map(|r| r.fraction_folded.values.get(row).copied().unwrap_or(f64::NAN))
            .collect();

        table.time.push(t);
        table.mean.push(mean(&values).unwrap_or(f64::NAN));
        table.sd.push(sample_sd(&values).unwrap_or(f64::NAN));
        table.sem.push(sem(&values).unwrap_or(f64::NAN));
        table.range.push(range(&values).unwrap_or(f64::NAN));
        table.n.push(values.iter().filter(|v| v.is_finite()).count());
    }

    Ok(table)
}

fn same_time_column(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}
