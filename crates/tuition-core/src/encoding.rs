//! Level/subject encoding: turn spreadsheet offering data into atomic
//! `(level, subject)` pairs.
//!
//! Two input forms are accepted:
//!
//! - explicit rows, one level and one subject each ([`EncodedOfferings::absorb_row`]);
//! - compact strings of `Subject|LevelRange` entries separated by `;`
//!   ([`EncodedOfferings::absorb_compact`]), e.g.
//!   `"Mathematics|Sec1-Sec2; Physics|J1"`.
//!
//! Each subject is crossed with its own range only. Problems are recorded as
//! [`QualityFlag`]s; nothing here fails.

use std::collections::BTreeSet;

use crate::{
  level::{LevelRange, parse_level_range},
  offering::OfferingPair,
  quality::QualityFlag,
  subject::{SubjectName, canonical_subject},
};

/// Everything known about one centre's offerings after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedOfferings {
  pub offerings:       BTreeSet<OfferingPair>,
  /// Subjects taught at levels that could not be pinned down. These become
  /// coarse centre–subject links without offerings.
  pub coarse_subjects: BTreeSet<String>,
  pub flags:           Vec<QualityFlag>,
}

impl EncodedOfferings {
  pub fn new() -> Self { Self::default() }

  /// Absorb a compact `Subject|Range; Subject|Range` string. An entry without
  /// a range counts as `UNKNOWN`.
  pub fn absorb_compact(&mut self, encoded: &str) {
    for entry in encoded.split(';').map(str::trim).filter(|e| !e.is_empty()) {
      match entry.split_once('|') {
        Some((subject, range)) => self.absorb(subject, range, entry),
        None => self.absorb(entry, "", entry),
      }
    }
  }

  /// Absorb one explicit offering row.
  pub fn absorb_row(&mut self, level: &str, subject: &str) {
    let entry = format!("{}|{}", subject.trim(), level.trim());
    self.absorb(subject, level, &entry);
  }

  fn absorb(&mut self, raw_subject: &str, raw_range: &str, entry: &str) {
    if raw_subject.trim().is_empty() {
      self.flag(QualityFlag::UnparseableLevel(entry.to_owned()));
      return;
    }

    let subject = match canonical_subject(raw_subject) {
      SubjectName::Canonical(subject) => subject,
      SubjectName::Unmapped(subject) => {
        self.flag(QualityFlag::UnmappedSubject(subject.clone()));
        subject
      }
      SubjectName::NotASubject => {
        self.flag(QualityFlag::NonSubject(raw_subject.trim().to_owned()));
        return;
      }
    };

    match parse_level_range(raw_range) {
      LevelRange::Levels { names, ambiguous } => {
        if ambiguous {
          self.flag(QualityFlag::AmbiguousLevelList(raw_range.trim().to_owned()));
        }
        for level in names {
          self.offerings.insert(OfferingPair::new(level, subject.clone()));
        }
      }
      LevelRange::Unknown => {
        self.flag(QualityFlag::UnknownLevels);
        self.coarse_subjects.insert(subject);
      }
      LevelRange::Unparseable => {
        self.flag(QualityFlag::UnparseableLevel(raw_range.trim().to_owned()));
        self.coarse_subjects.insert(subject);
      }
    }
  }

  fn flag(&mut self, flag: QualityFlag) {
    if !self.flags.contains(&flag) {
      self.flags.push(flag);
    }
  }

  /// Fold another centre record's offerings into this one.
  pub fn merge(&mut self, other: EncodedOfferings) {
    self.offerings.extend(other.offerings);
    self.coarse_subjects.extend(other.coarse_subjects);
    for flag in other.flags {
      self.flag(flag);
    }
  }

  /// Distinct level names across all offerings.
  pub fn levels(&self) -> BTreeSet<&str> {
    self.offerings.iter().map(|o| o.level.as_str()).collect()
  }

  /// Distinct subject names: offered ones plus coarse-only ones.
  pub fn subjects(&self) -> BTreeSet<&str> {
    self
      .offerings
      .iter()
      .map(|o| o.subject.as_str())
      .chain(self.coarse_subjects.iter().map(String::as_str))
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.offerings.is_empty() && self.coarse_subjects.is_empty()
  }
}

/// Encode a single compact string.
pub fn encode_compact(encoded: &str) -> EncodedOfferings {
  let mut out = EncodedOfferings::new();
  out.absorb_compact(encoded);
  out
}
