//! Kinetic model implementations.
//!
//! Models are implemented as small, pure functions so that fitting and plotting
//! code can stay generic.

pub mod model;

pub use model::*;
