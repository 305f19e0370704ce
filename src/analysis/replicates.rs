//! Per-reaction and per-condition decay fits.

use crate::domain::{
    AveragedFits, AveragedSet, ConditionFit, ConditionFits, DataSet, FitOptions, FitSet, ReactionFit,
};
use crate::error::AppError;
use crate::fit::fit_one_phase_decay;

/// Fit the one-phase decay to every reaction of every condition.
///
/// A failure in any single reaction aborts the whole run; the error names the
/// condition and reaction.
pub fn fit_data_set(data: &DataSet, opts: &FitOptions) -> Result<FitSet, AppError> {
    let mut conditions = Vec::with_capacity(data.conditions.len());
    for condition in &data.conditions {
        let mut reactions = Vec::with_capacity(condition.reactions.len());
        for reaction in &condition.reactions {
            let fit = fit_one_phase_decay(&reaction.points(), opts).map_err(|e| {
                AppError::new(
                    e.exit_code(),
                    format!("Fit failed for {} / {}: {e}", condition.name, reaction.name),
                )
            })?;
            log::debug!(
                "{} / {}: k={:.3e} s^-1 plateau={:.3}",
                condition.name,
                reaction.name,
                fit.params.k,
                fit.params.plateau
            );
            reactions.push(ReactionFit {
                reaction: reaction.name.clone(),
                fit,
            });
        }
        conditions.push(ConditionFits {
            condition: condition.name.clone(),
            reactions,
        });
    }
    Ok(FitSet { conditions })
}

/// Fit the one-phase decay to each condition's cross-replicate mean.
///
/// Conditions without averaged rows (no reactions) are skipped with a warning.
pub fn fit_averaged(averaged: &AveragedSet, opts: &FitOptions) -> Result<AveragedFits, AppError> {
    let mut conditions = Vec::with_capacity(averaged.conditions.len());
    for table in &averaged.conditions {
        if table.is_empty() {
            log::warn!("Condition '{}' has no averaged data; skipping its fit.", table.condition);
            continue;
        }
        let fit = fit_one_phase_decay(&table.points(), opts).map_err(|e| {
            AppError::new(
                e.exit_code(),
                format!("Fit failed for averaged {}: {e}", table.condition),
            )
        })?;
        conditions.push(ConditionFit {
            condition: table.condition.clone(),
            fit,
        });
    }
    Ok(AveragedFits { conditions })
}
