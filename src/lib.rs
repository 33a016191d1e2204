//! Mass-spectrometry raw data conversion.
//!
//! Reads instrument ASCII exports (blocks introduced by `FUNCTION <n>`) and
//! NetCDF/ANDI-MS `.cdf` files, normalizes each acquisition function into a
//! fixed-schema table and writes it as CSV (optionally Parquet) with a
//! per-channel chromatogram PNG.
//!
//! ```no_run
//! use std::path::Path;
//! use msanalyzer::data::{normalize, parse_file, write_csv, SourceFormat};
//!
//! let outcome = parse_file(Path::new("run.txt"), SourceFormat::Ascii)?;
//! for table in &outcome.tables {
//!     let table = normalize(table);
//!     write_csv(&table, Path::new(&format!("{}.csv", table.label())))?;
//! }
//! # Ok::<(), msanalyzer::Error>(())
//! ```

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod render;
pub mod session;

pub use error::{Error, Result};
pub use session::Session;
