//! Input/output helpers.
//!
//! - workbook ingest (`ingest`)
//! - CSV/XLSX result tables (`export`)
//! - analysis JSON read/write (`analysis_file`)

pub mod analysis_file;
pub mod export;
pub mod ingest;

pub use analysis_file::*;
pub use export::*;
pub use ingest::*;
