#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading and cleaning of parsed tourism establishment records.
//!
//! The stages here run in order over an in-memory table:
//!
//! 1. [`clean::Cleaner`] drops exact duplicates, rows without coordinates,
//!    and GPS outliers.
//! 2. [`categories::decompose_categories`] splits compound category codes
//!    into rating and type.
//! 3. [`rooms::merge_room_info`] attaches room totals after the spatial join.
//!
//! Every merge re-checks the row count and fails with
//! [`IngestError::RowCountMismatch`] rather than emitting a table with
//! duplicated or lost establishments.

pub mod categories;
pub mod clean;
pub mod load;
pub mod rooms;

use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// CSV parsing or writing failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A merge changed the number of rows, which means one side carried
    /// duplicate keys.
    #[error("Row count changed during {stage}: expected {expected}, got {actual}")]
    RowCountMismatch {
        /// Name of the merge that failed.
        stage: &'static str,
        /// Row count before the merge.
        expected: usize,
        /// Row count the merge would have produced.
        actual: usize,
    },
}
