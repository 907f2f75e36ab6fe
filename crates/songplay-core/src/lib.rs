//! Core domain model for songplay.
//!
//! This crate defines the star schema (the `songplays` fact table and the
//! `songs`, `artists`, `users` and `time` dimensions), the typed table
//! descriptions consumed by the bulk loader, and the SQLite `Database`.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
