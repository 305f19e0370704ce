//! Fitting and aggregation over the parsed data set.
//!
//! - one decay fit per reaction (`fit_data_set`)
//! - cross-replicate averages per condition (`average_by_condition`) and their fits
//!   (`fit_averaged`)
//! - initial rates (`initial_rates`) and their normalization to a control
//!   condition (`init_rates_as_percent_control`)

pub mod averaging;
pub mod rates;
pub mod replicates;

pub use averaging::*;
pub use rates::*;
pub use replicates::*;
