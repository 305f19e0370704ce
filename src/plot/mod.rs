//! Plotting.
//!
//! - SVG figures for reports and papers (`figures`)
//! - colour palettes (`palette`)
//! - terminal previews (`ascii`)

pub mod ascii;
pub mod figures;
pub mod palette;

pub use ascii::*;
pub use figures::*;
pub use palette::*;
