//! Data-quality flags and the classifier that turns them into a status.
//!
//! Normalization problems never block insertion. They are collected as
//! [`QualityFlag`]s while a centre is reconciled and folded into a
//! [`QualityStatus`] plus human-readable notes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Stored status of a centre's data.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
  #[default]
  Ok,
  NeedsReview,
}

/// The kind of a flag, used for counting in ingestion reports.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlagKind {
  FlaggedInSource,
  UnknownLevels,
  UnparseableLevel,
  AmbiguousLevelList,
  NonSubject,
  UnmappedSubject,
  NoOfferings,
  MissingWebsite,
  Verification,
  SourceNotes,
}

/// One diagnostic raised while reconciling a centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityFlag {
  /// The source row itself asked for review.
  FlaggedInSource,
  UnknownLevels,
  UnparseableLevel(String),
  AmbiguousLevelList(String),
  NonSubject(String),
  UnmappedSubject(String),
  /// The dataset carries offerings but none survived for this centre.
  NoOfferings,
  MissingWebsite,
  Verification(String),
  SourceNotes(String),
}

impl QualityFlag {
  pub fn kind(&self) -> FlagKind {
    match self {
      QualityFlag::FlaggedInSource => FlagKind::FlaggedInSource,
      QualityFlag::UnknownLevels => FlagKind::UnknownLevels,
      QualityFlag::UnparseableLevel(_) => FlagKind::UnparseableLevel,
      QualityFlag::AmbiguousLevelList(_) => FlagKind::AmbiguousLevelList,
      QualityFlag::NonSubject(_) => FlagKind::NonSubject,
      QualityFlag::UnmappedSubject(_) => FlagKind::UnmappedSubject,
      QualityFlag::NoOfferings => FlagKind::NoOfferings,
      QualityFlag::MissingWebsite => FlagKind::MissingWebsite,
      QualityFlag::Verification(_) => FlagKind::Verification,
      QualityFlag::SourceNotes(_) => FlagKind::SourceNotes,
    }
  }

  /// Whether the flag sends the centre to review. The rest are
  /// informational notes.
  pub fn needs_review(&self) -> bool {
    !matches!(
      self,
      QualityFlag::MissingWebsite
        | QualityFlag::Verification(_)
        | QualityFlag::SourceNotes(_)
    )
  }

  fn detail(&self) -> Option<&str> {
    match self {
      QualityFlag::UnparseableLevel(s)
      | QualityFlag::AmbiguousLevelList(s)
      | QualityFlag::NonSubject(s)
      | QualityFlag::UnmappedSubject(s)
      | QualityFlag::Verification(s)
      | QualityFlag::SourceNotes(s) => Some(s),
      _ => None,
    }
  }
}

fn describe(kind: FlagKind, details: &[&str]) -> String {
  let list = details.join(", ");
  match kind {
    FlagKind::FlaggedInSource => "Flagged for review in source data".into(),
    FlagKind::UnknownLevels => "Contains UNKNOWN level ranges".into(),
    FlagKind::UnparseableLevel => format!("Unparseable level ranges: {list}"),
    FlagKind::AmbiguousLevelList => {
      format!("Ambiguous level lists read as explicit levels: {list}")
    }
    FlagKind::NonSubject => format!("Non-subject entries filtered: {list}"),
    FlagKind::UnmappedSubject => format!("Unmapped subjects kept as-is: {list}"),
    FlagKind::NoOfferings => {
      "No valid subject-level pairs after normalization".into()
    }
    FlagKind::MissingWebsite => "Missing website URL".into(),
    FlagKind::Verification => format!("verification={list}"),
    FlagKind::SourceNotes => format!("Original notes: {}", details.join("; ")),
  }
}

const NOTE_SEPARATOR: &str = " | ";

/// The classifier's verdict for one centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quality {
  pub status: QualityStatus,
  pub notes:  Option<String>,
}

/// Fold a centre's flags into a status and notes.
///
/// Notes start with the source tag (when given) followed by one description
/// per flag kind, joined with `" | "`. Repeated details are listed once.
pub fn classify(flags: &[QualityFlag], source_tag: Option<&str>) -> Quality {
  let status = if flags.iter().any(QualityFlag::needs_review) {
    QualityStatus::NeedsReview
  } else {
    QualityStatus::Ok
  };

  let mut grouped: Vec<(FlagKind, Vec<&str>)> = Vec::new();
  for flag in flags {
    let kind = flag.kind();
    let index = match grouped.iter().position(|(k, _)| *k == kind) {
      Some(index) => index,
      None => {
        grouped.push((kind, Vec::new()));
        grouped.len() - 1
      }
    };
    if let Some(detail) = flag.detail() {
      let details = &mut grouped[index].1;
      if !details.contains(&detail) {
        details.push(detail);
      }
    }
  }
  grouped.sort_by_key(|(kind, _)| *kind);

  let parts: Vec<String> = source_tag
    .map(str::trim)
    .filter(|tag| !tag.is_empty())
    .map(str::to_owned)
    .into_iter()
    .chain(grouped.iter().map(|(kind, details)| describe(*kind, details)))
    .collect();

  let notes = (!parts.is_empty()).then(|| parts.join(NOTE_SEPARATOR));
  Quality { status, notes }
}

/// Fold further flags into a verdict already stored for a centre.
///
/// Review flags raise the status to `NEEDS_REVIEW`; nothing lowers it.
/// Note parts already present are not repeated.
pub fn reclassify(current: &Quality, flags: &[QualityFlag]) -> Quality {
  let extra = classify(flags, None);
  let status = match extra.status {
    QualityStatus::NeedsReview => QualityStatus::NeedsReview,
    QualityStatus::Ok => current.status,
  };

  let mut parts: Vec<&str> = current
    .notes
    .as_deref()
    .map(|notes| notes.split(NOTE_SEPARATOR).collect())
    .unwrap_or_default();
  if let Some(notes) = &extra.notes {
    for part in notes.split(NOTE_SEPARATOR) {
      if !parts.contains(&part) {
        parts.push(part);
      }
    }
  }

  let notes = (!parts.is_empty()).then(|| parts.join(NOTE_SEPARATOR));
  Quality { status, notes }
}
