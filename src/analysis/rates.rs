//! Initial folding rates and their normalization to a control condition.

use crate::domain::{
    ConditionNormalized, ConditionRates, DataSet, InitRate, InitRateSet, NormalizedRate, NormalizedRates,
    ReactionRate, TimeRange,
};
use crate::error::AppError;
use crate::fit::fit_linear;
use crate::math::mean;

/// Fit a line to the early part of every reaction's time course.
///
/// Only points whose time lies inside `window` (inclusive) are used.
pub fn initial_rates(data: &DataSet, window: TimeRange) -> Result<InitRateSet, AppError> {
    if !window.is_valid() {
        return Err(AppError::input(format!(
            "Invalid initial-rate window: [{}, {}].",
            window.min, window.max
        )));
    }

    let mut conditions = Vec::with_capacity(data.conditions.len());
    for condition in &data.conditions {
        let mut reactions = Vec::with_capacity(condition.reactions.len());
        for reaction in &condition.reactions {
            let points: Vec<(f64, f64)> = reaction
                .points()
                .into_iter()
                .filter(|(t, _)| window.contains(*t))
                .collect();
            let fit = fit_linear(&points).map_err(|e| {
                AppError::new(
                    e.exit_code(),
                    format!(
                        "Initial rate failed for {} / {} in window [{}, {}] s: {e}",
                        condition.name, reaction.name, window.min, window.max
                    ),
                )
            })?;
            let (x, y) = points.into_iter().unzip();
            reactions.push(ReactionRate {
                reaction: reaction.name.clone(),
                rate: InitRate { fit, x, y },
            });
        }
        conditions.push(ConditionRates {
            condition: condition.name.clone(),
            reactions,
        });
    }
    Ok(InitRateSet { conditions })
}

/// Mean initial rate (slope) across a condition's reactions.
pub fn average_init_rate(rates: &InitRateSet, condition: &str) -> Result<f64, AppError> {
    let entry = rates
        .condition(condition)
        .ok_or_else(|| AppError::input(format!("Unknown condition '{condition}'.")))?;
    let slopes: Vec<f64> = entry.reactions.iter().map(|r| r.rate.slope()).collect();
    mean(&slopes).ok_or_else(|| {
        AppError::no_data(format!("Condition '{condition}' has no initial rates to average."))
    })
}

/// Express every reaction's initial rate as a percentage of the control
/// condition's mean initial rate.
pub fn init_rates_as_percent_control(rates: &InitRateSet, control: &str) -> Result<NormalizedRates, AppError> {
    let control_mean = average_init_rate(rates, control)?;
    if !control_mean.is_finite() || control_mean == 0.0 {
        return Err(AppError::numeric(format!(
            "Control '{control}' has a mean initial rate of {control_mean}; cannot normalize."
        )));
    }

    let conditions = rates
        .conditions
        .iter()
        .map(|c| ConditionNormalized {
            condition: c.condition.clone(),
            reactions: c
                .reactions
                .iter()
                .map(|r| NormalizedRate {
                    reaction: r.reaction.clone(),
                    percent: r.rate.slope() / control_mean * 100.0,
                })
                .collect(),
        })
        .collect();

    Ok(NormalizedRates {
        control: control.to_string(),
        control_mean_slope: control_mean,
        conditions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::table;
    use crate::domain::ConditionData;

    fn data() -> DataSet {
        DataSet {
            conditions: vec![
                ConditionData {
                    name: "WT".to_string(),
                    reactions: vec![
                        table("Rep1", &[0.0, 60.0, 120.0, 3600.0], &[0.0, 0.06, 0.12, 0.9]),
                        table("Rep2", &[0.0, 60.0, 120.0, 3600.0], &[0.0, 0.12, 0.24, 0.9]),
                    ],
                },
                ConditionData {
                    name: "Slow".to_string(),
                    reactions: vec![table("Rep1", &[0.0, 60.0, 120.0, 3600.0], &[0.0, 0.045, 0.09, 0.5])],
                },
            ],
        }
    }

    #[test]
    fn rates_use_only_the_window() {
        let rates = initial_rates(&data(), TimeRange::new(0.0, 120.0)).unwrap();
        let rep1 = rates.condition("WT").unwrap().reaction("Rep1").unwrap();
        assert_eq!(rep1.x, vec![0.0, 60.0, 120.0]);
        assert!((rep1.slope() - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn control_mean_normalizes_to_one_hundred() {
        let rates = initial_rates(&data(), TimeRange::new(0.0, 120.0)).unwrap();
        assert!((average_init_rate(&rates, "WT").unwrap() - 1.5e-3).abs() < 1e-12);

        let norm = init_rates_as_percent_control(&rates, "WT").unwrap();
        let wt: f64 = norm.conditions[0].reactions.iter().map(|r| r.percent).sum::<f64>() / 2.0;
        assert!((wt - 100.0).abs() < 1e-9);
        assert!((norm.get("Slow", "Rep1").unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_control_is_an_input_error() {
        let rates = initial_rates(&data(), TimeRange::new(0.0, 120.0)).unwrap();
        assert_eq!(init_rates_as_percent_control(&rates, "Nope").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn too_few_points_in_window_fails() {
        assert!(initial_rates(&data(), TimeRange::new(0.0, 30.0)).is_err());
    }
}
