//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs are hyphenated lowercase strings,
//! and the quality status uses its `strum` text form (`OK`, `NEEDS_REVIEW`).

use chrono::{DateTime, Utc};
use tuition_core::{
  centre::{Centre, CentreView},
  level::compare_levels,
  offering::{Level, OfferingPair, Subject},
  quality::QualityStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_status(status: QualityStatus) -> &'static str { status.into() }

pub fn decode_status(s: &str) -> Result<QualityStatus> {
  s.parse()
    .map_err(|_| tuition_core::Error::UnknownQualityStatus(s.to_owned()).into())
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column list matching [`RawCentre::from_row`], for a `centres c` alias.
pub const CENTRE_COLUMNS: &str = "c.centre_id, c.name, c.location, \
                                  c.whatsapp_number, c.website, \
                                  c.quality_status, c.quality_notes, \
                                  c.created_at, c.updated_at";

/// A `centres` row as read from SQLite, before decoding.
#[derive(Debug)]
pub struct RawCentre {
  pub centre_id:       String,
  pub name:            String,
  pub location:        String,
  pub whatsapp_number: Option<String>,
  pub website:         Option<String>,
  pub quality_status:  String,
  pub quality_notes:   Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawCentre {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      centre_id:       row.get(0)?,
      name:            row.get(1)?,
      location:        row.get(2)?,
      whatsapp_number: row.get(3)?,
      website:         row.get(4)?,
      quality_status:  row.get(5)?,
      quality_notes:   row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
    })
  }

  pub fn into_centre(self) -> Result<Centre> {
    Ok(Centre {
      centre_id:       decode_uuid(&self.centre_id)?,
      name:            self.name,
      location:        self.location,
      whatsapp_number: self.whatsapp_number,
      website:         self.website,
      quality_status:  decode_status(&self.quality_status)?,
      quality_notes:   self.quality_notes,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// A centre with its links and offerings, as read inside one transaction.
#[derive(Debug)]
pub struct RawCentreView {
  pub centre:    RawCentre,
  /// `(level_id, name)`
  pub levels:    Vec<(String, String)>,
  /// `(subject_id, name)`
  pub subjects:  Vec<(String, String)>,
  /// `(level name, subject name)`
  pub offerings: Vec<(String, String)>,
}

impl RawCentreView {
  pub fn into_view(self) -> Result<CentreView> {
    let mut levels = self
      .levels
      .into_iter()
      .map(|(id, name)| Ok(Level { level_id: decode_uuid(&id)?, name }))
      .collect::<Result<Vec<_>>>()?;
    levels.sort_by(|a, b| compare_levels(&a.name, &b.name));

    let mut subjects = self
      .subjects
      .into_iter()
      .map(|(id, name)| Ok(Subject { subject_id: decode_uuid(&id)?, name }))
      .collect::<Result<Vec<_>>>()?;
    subjects.sort_by(|a, b| a.name.cmp(&b.name));

    let mut offerings: Vec<OfferingPair> = self
      .offerings
      .into_iter()
      .map(|(level, subject)| OfferingPair { level, subject })
      .collect();
    offerings.sort_by(|a, b| {
      compare_levels(&a.level, &b.level).then_with(|| a.subject.cmp(&b.subject))
    });

    Ok(CentreView {
      centre: self.centre.into_centre()?,
      levels,
      subjects,
      offerings,
    })
  }
}
