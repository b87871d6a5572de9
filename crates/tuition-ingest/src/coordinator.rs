//! The ingestion coordinator.
//!
//! Runs one sequential pass over the source. Only an unreachable store is
//! fatal; every other problem is counted in the [`IngestReport`] and the
//! batch continues. Re-running the same source is safe: existing centres are
//! recognised by their dedupe key and offerings are insert-or-ignore.

use std::collections::{HashMap, HashSet};

use tracing::{error, info, warn};
use tuition_core::{
  centre::{Centre, DedupeKey},
  encoding::EncodedOfferings,
  name::normalize_identity,
  quality::{Quality, QualityFlag, QualityStatus, reclassify},
  store::DirectoryStore,
};
use uuid::Uuid;

use crate::{
  IngestError, Result,
  candidate::{CentreCandidate, ENCODED_OFFERING_COLUMNS},
  report::{IngestReport, SkipReason},
  source::Table,
};

pub const DEFAULT_SOURCE_TAG: &str = "sourceDataset=database_ready_v1";

/// The tables to ingest.
#[derive(Debug, Clone, Default)]
pub struct IngestSource {
  pub centres:   Table,
  /// Optional explicit offerings sheet: one level and subject per row.
  pub offerings: Option<Table>,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
  /// Prefixed to every centre's quality notes.
  pub source_tag:   String,
  /// Location used when a record has neither address nor area.
  pub default_area: Option<String>,
  /// Classify against the store but write nothing.
  pub dry_run:      bool,
}

impl Default for IngestOptions {
  fn default() -> Self {
    Self {
      source_tag:   DEFAULT_SOURCE_TAG.to_owned(),
      default_area: None,
      dry_run:      false,
    }
  }
}

/// Level and subject ids seen during this run.
#[derive(Default)]
struct NameCache {
  levels:   HashMap<String, Uuid>,
  subjects: HashMap<String, Uuid>,
}

impl NameCache {
  async fn level<S: DirectoryStore>(
    &mut self,
    store: &S,
    name: &str,
  ) -> Result<Uuid, S::Error> {
    if let Some(id) = self.levels.get(name) {
      return Ok(*id);
    }
    let level = store.upsert_level(name).await?;
    self.levels.insert(name.to_owned(), level.level_id);
    Ok(level.level_id)
  }

  async fn subject<S: DirectoryStore>(
    &mut self,
    store: &S,
    name: &str,
  ) -> Result<Uuid, S::Error> {
    if let Some(id) = self.subjects.get(name) {
      return Ok(*id);
    }
    let subject = store.upsert_subject(name).await?;
    self.subjects.insert(name.to_owned(), subject.subject_id);
    Ok(subject.subject_id)
  }
}

#[derive(Default)]
struct Persisted {
  offerings:     usize,
  level_links:   usize,
  subject_links: usize,
}

/// Store a centre's offerings and coarse links. Every write is idempotent.
async fn persist_offerings<S: DirectoryStore>(
  store: &S,
  cache: &mut NameCache,
  centre_id: Uuid,
  encoded: &EncodedOfferings,
) -> Result<Persisted, S::Error> {
  let mut persisted = Persisted::default();

  for level in encoded.levels() {
    let level_id = cache.level(store, level).await?;
    if store.link_level(centre_id, level_id).await? {
      persisted.level_links += 1;
    }
  }
  for subject in encoded.subjects() {
    let subject_id = cache.subject(store, subject).await?;
    if store.link_subject(centre_id, subject_id).await? {
      persisted.subject_links += 1;
    }
  }
  for pair in &encoded.offerings {
    let level_id = cache.level(store, &pair.level).await?;
    let subject_id = cache.subject(store, &pair.subject).await?;
    if store.add_offering(centre_id, level_id, subject_id).await? {
      persisted.offerings += 1;
    }
  }
  Ok(persisted)
}

/// Fold offering-sheet rows onto candidates. Returns the number of rows that
/// matched no candidate.
fn attach_offering_rows(
  candidates: &mut [CentreCandidate],
  offerings: &Table,
) -> usize {
  let mut orphans = 0;
  for record in &offerings.records {
    let Some(name) = record.text("centre_name") else {
      warn!(row = record.row, "offering row without centre name");
      orphans += 1;
      continue;
    };
    let area = record.text("area");
    let identity = normalize_identity(
      &name,
      record.text("branch_name").as_deref(),
      None,
      area.as_deref(),
    );
    let level = record.text("level").unwrap_or_default();
    let subject = record.text("subject").unwrap_or_default();

    let mut matched = false;
    for candidate in candidates
      .iter_mut()
      .filter(|c| c.accepts(&identity.display_name, area.as_deref()))
    {
      candidate.offerings.absorb_row(&level, &subject);
      matched = true;
    }
    if !matched {
      warn!(
        row = record.row,
        centre = %identity.display_name,
        "offering row matches no centre"
      );
      orphans += 1;
    }
  }
  orphans
}

/// Count a newly inserted (or, in a dry run, insertable) centre.
fn record_new(
  report: &mut IngestReport,
  candidate: &CentreCandidate,
  status: QualityStatus,
  dataset_has_offerings: bool,
) {
  report.inserted += 1;
  report.record_status(status);
  for flag in candidate.flags(dataset_has_offerings) {
    report.record_flag(flag.kind());
  }
}

/// The quality a stored centre should carry once `merged` offerings are
/// attached to it, or `None` when its stored verdict already covers them.
fn merged_quality(existing: &Centre, merged: &EncodedOfferings) -> Option<Quality> {
  let review: Vec<QualityFlag> = merged
    .flags
    .iter()
    .filter(|flag| flag.needs_review())
    .cloned()
    .collect();
  if review.is_empty() {
    return None;
  }
  let current = Quality {
    status: existing.quality_status,
    notes:  existing.quality_notes.clone(),
  };
  let updated = reclassify(&current, &review);
  (updated != current).then_some(updated)
}

/// Ingest `source` into `store`.
///
/// Fails only when the store cannot be reached before the run starts. With
/// [`IngestOptions::dry_run`] the store is only read; the report then counts
/// what a real run would insert.
pub async fn ingest<S: DirectoryStore>(
  store: &S,
  source: IngestSource,
  options: &IngestOptions,
) -> Result<IngestReport> {
  let existing = store
    .centre_count()
    .await
    .map_err(|e| IngestError::StoreUnavailable(e.to_string()))?;
  info!(existing, rows = source.centres.records.len(), "ingestion started");

  let mut report = IngestReport::new(&options.source_tag);
  report.total_rows = source.centres.records.len();
  report.dry_run = options.dry_run;

  let dataset_has_offerings = source.offerings.is_some()
    || ENCODED_OFFERING_COLUMNS
      .iter()
      .any(|column| source.centres.has_column(column));

  let mut candidates = Vec::new();
  for record in &source.centres.records {
    if !record.is_complete() {
      warn!(row = record.row, missing = ?record.missing, "incomplete row");
    }
    match CentreCandidate::from_record(record, options.default_area.as_deref()) {
      Ok(candidate) => candidates.push(candidate),
      Err(reason) => {
        warn!(row = record.row, %reason, "skipping row");
        report.skip(reason);
      }
    }
  }

  if let Some(offerings) = &source.offerings {
    report.orphan_offering_rows = attach_offering_rows(&mut candidates, offerings);
  }
  report.candidates = candidates.len();

  let mut cache = NameCache::default();
  // Keys a dry run would have inserted; the store never sees them.
  let mut planned: HashSet<DedupeKey> = HashSet::new();

  for candidate in &candidates {
    let name = candidate.display_name();
    let Some(new_centre) =
      candidate.to_new_centre(dataset_has_offerings, &options.source_tag)
    else {
      report.skip(SkipReason::MissingLocation);
      continue;
    };
    let key = new_centre.dedupe_key();
    let status = new_centre.quality_status;

    let found = match store.find_centre(&key).await {
      Ok(found) => found,
      Err(e) => {
        error!(row = candidate.row, centre = %name, error = %e, "lookup failed");
        report.record_error(candidate.row, Some(name), e.to_string());
        continue;
      }
    };

    if options.dry_run {
      match found {
        Some(existing) => {
          report.skip(SkipReason::Duplicate);
          if merged_quality(&existing, &candidate.offerings).is_some() {
            report.requalified += 1;
          }
        }
        None if !planned.insert(key.clone()) => report.skip(SkipReason::Duplicate),
        None => {
          record_new(&mut report, candidate, status, dataset_has_offerings);
          report.offerings_added += candidate.offerings.offerings.len();
          report.level_links_added += candidate.offerings.levels().len();
          report.subject_links_added += candidate.offerings.subjects().len();
        }
      }
      continue;
    }

    // `merged_into` is set when the row lands on a centre already stored.
    let (centre_id, merged_into) = match found {
      Some(existing) => (existing.centre_id, Some(existing)),
      None => match store.insert_centre(new_centre).await {
        Ok(centre) => {
          record_new(&mut report, candidate, status, dataset_has_offerings);
          if status == QualityStatus::NeedsReview {
            warn!(row = candidate.row, centre = %name, "inserted for review");
          } else {
            info!(row = candidate.row, centre = %name, "inserted");
          }
          (centre.centre_id, None)
        }
        Err(e) if S::is_duplicate(&e) => {
          warn!(row = candidate.row, centre = %name, "centre inserted concurrently");
          match store.find_centre(&key).await {
            Ok(Some(existing)) => (existing.centre_id, Some(existing)),
            _ => {
              report.skip(SkipReason::Duplicate);
              continue;
            }
          }
        }
        Err(e) => {
          error!(row = candidate.row, centre = %name, error = %e, "insert failed");
          report.record_error(candidate.row, Some(name), e.to_string());
          continue;
        }
      },
    };

    if let Some(existing) = &merged_into {
      info!(row = candidate.row, centre = %name, "duplicate, merging offerings");
      report.skip(SkipReason::Duplicate);
      if let Some(quality) = merged_quality(existing, &candidate.offerings) {
        match store.update_quality(centre_id, quality).await {
          Ok(_) => {
            warn!(
              row = candidate.row,
              centre = %name,
              "merged offerings need review"
            );
            report.requalified += 1;
          }
          Err(e) => {
            error!(
              row = candidate.row,
              centre = %name,
              error = %e,
              "quality update failed"
            );
            report.record_error(
              candidate.row,
              Some(name),
              format!("quality update failed: {e}"),
            );
          }
        }
      }
    }

    match persist_offerings(store, &mut cache, centre_id, &candidate.offerings)
      .await
    {
      Ok(persisted) => {
        report.offerings_added += persisted.offerings;
        report.level_links_added += persisted.level_links;
        report.subject_links_added += persisted.subject_links;
      }
      Err(e) => {
        error!(
          row = candidate.row,
          centre = %name,
          error = %e,
          "offering persistence failed"
        );
        report.record_error(
          candidate.row,
          Some(name),
          format!("offerings incomplete: {e}"),
        );
      }
    }
  }

  info!(
    inserted = report.inserted,
    skipped = report.skipped_total(),
    errored = report.errored,
    offerings = report.offerings_added,
    "ingestion finished"
  );
  Ok(report)
}
