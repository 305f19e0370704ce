//! Mathematical utilities: linear least squares and replicate statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
