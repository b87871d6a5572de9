//! A centre: one physical tuition centre (or branch) in the directory.
//!
//! Centres are created by ingestion and identified for deduplication by their
//! `(name, location)` pair. Offerings and coarse level/subject links hang off
//! a centre and are removed with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  name,
  offering::{Level, OfferingPair, Subject},
  quality::QualityStatus,
};

// ─── Centre ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Centre {
  pub centre_id:       Uuid,
  /// Display name; may carry a trailing `(branch)`.
  pub name:            String,
  pub location:        String,
  /// Digits with an optional leading `+`.
  pub whatsapp_number: Option<String>,
  pub website:         Option<String>,
  pub quality_status:  QualityStatus,
  /// `" | "`-joined diagnostics, prefixed with the source dataset tag.
  pub quality_notes:   Option<String>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Centre {
  pub fn dedupe_key(&self) -> DedupeKey {
    DedupeKey { name: self.name.clone(), location: self.location.clone() }
  }

  /// The name without its branch suffix.
  pub fn base_name(&self) -> &str { name::centre_name(&self.name) }

  /// The branch embedded in the display name, if any.
  pub fn branch(&self) -> Option<&str> { name::branch_name(&self.name) }
}

/// The uniqueness key for a centre.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DedupeKey {
  pub name:     String,
  pub location: String,
}

/// Input for [`DirectoryStore::insert_centre`](crate::store::DirectoryStore::insert_centre).
/// Id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCentre {
  pub name:            String,
  pub location:        String,
  pub whatsapp_number: Option<String>,
  pub website:         Option<String>,
  pub quality_status:  QualityStatus,
  pub quality_notes:   Option<String>,
}

impl NewCentre {
  pub fn dedupe_key(&self) -> DedupeKey {
    DedupeKey { name: self.name.clone(), location: self.location.clone() }
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A centre together with its coarse links and atomic offerings, as shown in
/// listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentreView {
  pub centre:    Centre,
  /// Coarse level links, ordered by academic stage.
  pub levels:    Vec<Level>,
  /// Coarse subject links, ordered by name.
  pub subjects:  Vec<Subject>,
  pub offerings: Vec<OfferingPair>,
}

/// One page of search results plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CentrePage {
  pub centres: Vec<CentreView>,
  pub total:   u64,
}

/// Row counts removed by [`DirectoryStore::wipe`](crate::store::DirectoryStore::wipe).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WipeSummary {
  pub offerings:       u64,
  pub centre_levels:   u64,
  pub centre_subjects: u64,
  pub centres:         u64,
  pub levels:          u64,
  pub subjects:        u64,
}

impl WipeSummary {
  pub fn total(&self) -> u64 {
    self.offerings
      + self.centre_levels
      + self.centre_subjects
      + self.centres
      + self.levels
      + self.subjects
  }
}
