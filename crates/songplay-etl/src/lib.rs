//! Extract, transform and load stages for songplay.
//!
//! Reads line-delimited JSON catalog and event files, normalizes them into
//! typed rows, derives the time and user dimensions, resolves play events
//! against the loaded catalog, and bulk loads every table one file at a time.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod batch;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod facts;
pub mod load;
pub mod records;
pub mod scan;

pub use batch::{load_log_file, load_song_file, BatchReport, BatchRunner, FileSummary, SourceKind};
pub use config::Config;
pub use error::{EtlError, EtlResult};
pub use load::{copy_rows, CopyOptions, CopyRow};
pub use records::{CatalogRecord, EventRecord};
