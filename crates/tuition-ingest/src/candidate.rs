//! Centre candidates: one reconciled centre per source record.

use tuition_core::{
  centre::{DedupeKey, NewCentre},
  encoding::EncodedOfferings,
  name::{CentreIdentity, normalize_identity},
  phone::sanitize_phone,
  quality::{QualityFlag, classify},
};

use crate::{report::SkipReason, source::RawRecord};

/// Columns holding compact `Subject|Range; …` offering strings.
pub const ENCODED_OFFERING_COLUMNS: &[&str] = &[
  "offerings",
  "primary_subjects_fmt",
  "secondary_subjects_fmt",
  "jc_h1_subjects_fmt",
  "jc_h2_subjects_fmt",
  "jc_unknown_subjects_fmt",
];

/// A centre reconciled from a source record, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CentreCandidate {
  pub row:             u64,
  pub identity:        CentreIdentity,
  /// Raw area cell, kept for matching offering-sheet rows.
  pub area:            Option<String>,
  pub whatsapp_number: Option<String>,
  pub website:         Option<String>,
  pub offerings:       EncodedOfferings,
  /// Flags raised by the record itself rather than by its offerings.
  pub record_flags:    Vec<QualityFlag>,
}

impl CentreCandidate {
  /// Reconcile a centres-sheet record. Fails only on missing identity.
  pub fn from_record(
    record: &RawRecord,
    default_area: Option<&str>,
  ) -> Result<Self, SkipReason> {
    let name = record.text("centre_name").ok_or(SkipReason::MissingName)?;
    let area = record.text("area");
    let identity = normalize_identity(
      &name,
      record.text("branch_name").as_deref(),
      record.text("address").as_deref(),
      area.as_deref().or(default_area),
    );
    if identity.display_name.is_empty() {
      return Err(SkipReason::MissingName);
    }
    if identity.location.is_none() {
      return Err(SkipReason::MissingLocation);
    }

    let website = record
      .text("website_url")
      .or_else(|| record.text("source_url"));
    let whatsapp_number = record
      .text("whatsapp_number")
      .as_deref()
      .and_then(sanitize_phone);

    let mut record_flags = Vec::new();
    if record.get("needs_review").is_some_and(|c| c.is_truthy()) {
      record_flags.push(QualityFlag::FlaggedInSource);
    }
    if website.is_none() {
      record_flags.push(QualityFlag::MissingWebsite);
    }
    if let Some(status) = record.text("verification_status") {
      record_flags.push(QualityFlag::Verification(status));
    }
    if let Some(notes) = record.text("notes") {
      record_flags.push(QualityFlag::SourceNotes(notes));
    }

    let mut offerings = EncodedOfferings::new();
    for column in ENCODED_OFFERING_COLUMNS {
      if let Some(encoded) = record.text(column) {
        offerings.absorb_compact(&encoded);
      }
    }

    Ok(Self {
      row: record.row,
      identity,
      area,
      whatsapp_number,
      website,
      offerings,
      record_flags,
    })
  }

  /// The dedupe key. Candidates are only built with a location, so this is
  /// always present for them.
  pub fn dedupe_key(&self) -> Option<DedupeKey> { self.identity.dedupe_key() }

  pub fn display_name(&self) -> &str { &self.identity.display_name }

  /// Whether an offering-sheet row naming `display_name` in `area` belongs
  /// to this candidate. A row without an area matches by name alone.
  pub fn accepts(&self, display_name: &str, area: Option<&str>) -> bool {
    if self.identity.display_name != display_name {
      return false;
    }
    match area {
      None => true,
      Some(area) => {
        self.area.as_deref() == Some(area)
          || self.identity.location.as_deref() == Some(area)
      }
    }
  }

  /// All flags for the candidate. `NoOfferings` is raised only when the
  /// dataset carries offering data at all.
  pub fn flags(&self, dataset_has_offerings: bool) -> Vec<QualityFlag> {
    let mut flags = self.record_flags.clone();
    flags.extend(self.offerings.flags.iter().cloned());
    if dataset_has_offerings && self.offerings.offerings.is_empty() {
      flags.push(QualityFlag::NoOfferings);
    }
    flags
  }

  /// The row to insert, with quality classified.
  pub fn to_new_centre(
    &self,
    dataset_has_offerings: bool,
    source_tag: &str,
  ) -> Option<NewCentre> {
    let key = self.dedupe_key()?;
    let quality = classify(&self.flags(dataset_has_offerings), Some(source_tag));
    Some(NewCentre {
      name:            key.name,
      location:        key.location,
      whatsapp_number: self.whatsapp_number.clone(),
      website:         self.website.clone(),
      quality_status:  quality.status,
      quality_notes:   quality.notes,
    })
  }
}
