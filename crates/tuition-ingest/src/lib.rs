//! Batch ingestion of spreadsheet exports into a [`DirectoryStore`].
//!
//! The pipeline is: [`source`] reads CSV into raw records, [`candidate`]
//! reconciles each record into a centre candidate (identity, offerings,
//! flags), and [`coordinator`] persists candidates and produces an
//! [`IngestReport`].
//!
//! [`DirectoryStore`]: tuition_core::store::DirectoryStore

pub mod candidate;
pub mod coordinator;
pub mod error;
pub mod report;
pub mod source;

pub use coordinator::{IngestOptions, IngestSource, ingest};
pub use error::{IngestError, Result};
pub use report::IngestReport;

#[cfg(test)]
mod tests;
