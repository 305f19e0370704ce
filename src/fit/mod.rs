//! Curve fitting.
//!
//! Responsibilities:
//!
//! - generate rate-constant grids (`rate_grid`)
//! - fit the one-phase decay by grid seed + Levenberg–Marquardt (`fitter`)
//! - fit initial-rate lines by ordinary least squares (`linear`)

pub mod fitter;
pub mod linear;
pub mod rate_grid;

pub use fitter::*;
pub use linear::*;
pub use rate_grid::*;
