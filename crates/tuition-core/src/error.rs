//! Error types for `tuition-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("centre already exists: {name} @ {location}")]
  DuplicateCentre { name: String, location: String },

  #[error("centre not found: {0}")]
  CentreNotFound(Uuid),

  #[error("level not found: {0}")]
  LevelNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("unknown quality status: {0:?}")]
  UnknownQualityStatus(String),

  #[error("in-memory store lock poisoned")]
  LockPoisoned,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
