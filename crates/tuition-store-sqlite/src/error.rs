//! Error type for `tuition-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tuition_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row that should exist right after writing it was not found.
  #[error("{table} row missing after upsert: {name:?}")]
  MissingAfterUpsert { table: &'static str, name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
