//! `gel-kinetics-fit` library crate.
//!
//! The binary (`gkfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the parsing, fitting and plotting steps can be scripted from other tools
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
