//! Reference data (levels, subjects) and the atomic offering pair.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::name::collapse_whitespace;

/// The stored form of a level or subject name. Every store upserts through
/// this so that `" JC  1"` and `"JC 1"` are the same row.
pub fn reference_name(raw: &str) -> String { collapse_whitespace(raw) }

/// A canonical academic level, e.g. "Primary 6" or "JC 1".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
  pub level_id: Uuid,
  pub name:     String,
}

/// A canonical academic subject, e.g. "Mathematics".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub name:       String,
}

/// One `(level, subject)` fact for a centre, by canonical name.
///
/// The filter engine matches against these pairs as whole rows: a centre
/// offering "Secondary 1 Physics" and "JC 1 Chemistry" does not offer
/// "JC 1 Physics".
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OfferingPair {
  pub level:   String,
  pub subject: String,
}

impl OfferingPair {
  pub fn new(level: impl Into<String>, subject: impl Into<String>) -> Self {
    Self { level: level.into(), subject: subject.into() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reference_names_are_whitespace_collapsed() {
    assert_eq!(reference_name(" JC  1 "), "JC 1");
    assert_eq!(reference_name("Mathematics"), "Mathematics");
  }
}
