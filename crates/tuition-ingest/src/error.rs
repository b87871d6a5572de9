//! Error type for `tuition-ingest`.
//!
//! Only whole-run failures surface here. Problems with individual rows are
//! recorded in the [`IngestReport`](crate::IngestReport) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("no header row found in {0}")]
  EmptySource(String),

  #[error("store unavailable: {0}")]
  StoreUnavailable(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
