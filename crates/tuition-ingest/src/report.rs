//! The ingestion report: counts for the operator, plus row-level errors.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use strum::Display;
use tuition_core::quality::{FlagKind, QualityStatus};

/// Why a source row did not produce a new centre.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
  MissingName,
  MissingLocation,
  /// A centre with the same `(name, location)` already exists.
  Duplicate,
}

/// A persistence failure for one row. The batch carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
  pub row:     u64,
  pub centre:  Option<String>,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub source_tag:           String,
  /// Nothing was written; counts describe what a real run would do.
  pub dry_run:              bool,
  pub total_rows:           usize,
  pub candidates:           usize,
  pub inserted:             usize,
  pub skipped:              BTreeMap<SkipReason, usize>,
  pub errored:              usize,
  pub status_ok:            usize,
  pub status_needs_review:  usize,
  /// Flag occurrences across inserted centres.
  pub flags:                BTreeMap<FlagKind, usize>,
  /// Existing centres whose quality was raised by merged offerings.
  pub requalified:          usize,
  /// In a dry run, the offerings new centres would receive.
  pub offerings_added:      usize,
  pub level_links_added:    usize,
  pub subject_links_added:  usize,
  /// Offering-sheet rows that named no known centre.
  pub orphan_offering_rows: usize,
  pub row_errors:           Vec<RowError>,
}

impl IngestReport {
  pub fn new(source_tag: impl Into<String>) -> Self {
    Self { source_tag: source_tag.into(), ..Default::default() }
  }

  pub fn skip(&mut self, reason: SkipReason) {
    *self.skipped.entry(reason).or_default() += 1;
  }

  pub fn skipped(&self, reason: SkipReason) -> usize {
    self.skipped.get(&reason).copied().unwrap_or(0)
  }

  pub fn skipped_total(&self) -> usize { self.skipped.values().sum() }

  pub fn record_status(&mut self, status: QualityStatus) {
    match status {
      QualityStatus::Ok => self.status_ok += 1,
      QualityStatus::NeedsReview => self.status_needs_review += 1,
    }
  }

  pub fn record_flag(&mut self, kind: FlagKind) {
    *self.flags.entry(kind).or_default() += 1;
  }

  pub fn record_error(
    &mut self,
    row: u64,
    centre: Option<&str>,
    message: impl Into<String>,
  ) {
    self.errored += 1;
    self.row_errors.push(RowError {
      row,
      centre: centre.map(str::to_owned),
      message: message.into(),
    });
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

impl fmt::Display for IngestReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.dry_run {
      writeln!(f, "Ingestion summary ({}, dry run)", self.source_tag)?;
    } else {
      writeln!(f, "Ingestion summary ({})", self.source_tag)?;
    }
    writeln!(f, "  rows read:          {}", self.total_rows)?;
    writeln!(f, "  candidates:         {}", self.candidates)?;
    writeln!(f, "  inserted:           {}", self.inserted)?;
    writeln!(f, "  skipped:            {}", self.skipped_total())?;
    for (reason, count) in &self.skipped {
      writeln!(f, "    {reason}: {count}")?;
    }
    writeln!(f, "  errored:            {}", self.errored)?;
    writeln!(f, "  status OK:          {}", self.status_ok)?;
    writeln!(f, "  status NEEDS_REVIEW: {}", self.status_needs_review)?;
    if !self.flags.is_empty() {
      writeln!(f, "  quality flags:")?;
      for (kind, count) in &self.flags {
        writeln!(f, "    {kind}: {count}")?;
      }
    }
    if self.requalified > 0 {
      writeln!(f, "  requalified:        {}", self.requalified)?;
    }
    writeln!(f, "  offerings added:    {}", self.offerings_added)?;
    writeln!(f, "  level links added:  {}", self.level_links_added)?;
    writeln!(f, "  subject links added: {}", self.subject_links_added)?;
    if self.orphan_offering_rows > 0 {
      writeln!(f, "  orphan offering rows: {}", self.orphan_offering_rows)?;
    }
    for error in &self.row_errors {
      writeln!(
        f,
        "  row {} ({}): {}",
        error.row,
        error.centre.as_deref().unwrap_or("?"),
        error.message
      )?;
    }
    Ok(())
  }
}
