//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parsed workbook tables (`DataSet`, `ConditionData`, `ReactionTable`)
//! - fit outputs (`DecayFit`, `FitSet`, `AveragedFits`, `InitRateSet`, `NormalizedRates`)
//! - run configuration (`AnalysisConfig`, `FitOptions`, `TimeRange`)

pub mod types;

pub use types::*;
