//! The `DirectoryStore` trait.
//!
//! Implemented by `tuition-store-sqlite` and by the in-memory
//! [`MemoryStore`](crate::memory::MemoryStore). Ingestion and the HTTP layer
//! depend on this abstraction only.

use std::future::Future;

use uuid::Uuid;

use crate::{
  centre::{Centre, CentrePage, CentreView, DedupeKey, NewCentre, WipeSummary},
  filter::CentreQuery,
  offering::{Level, Subject},
  quality::Quality,
};

/// Abstraction over a directory storage backend.
///
/// Writes are idempotent where the data model allows it: levels and subjects
/// are upserted by name, offerings and coarse links are insert-or-ignore.
/// Centre uniqueness on `(name, location)` is enforced by the backend.
pub trait DirectoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether `error` is the dedupe-key collision raised by
  /// [`insert_centre`](Self::insert_centre).
  fn is_duplicate(error: &Self::Error) -> bool;

  // ── Centres ───────────────────────────────────────────────────────────

  /// Look up a centre by its dedupe key.
  fn find_centre<'a>(
    &'a self,
    key: &'a DedupeKey,
  ) -> impl Future<Output = Result<Option<Centre>, Self::Error>> + Send + 'a;

  /// Insert a centre. Fails if the dedupe key is taken.
  fn insert_centre(
    &self,
    input: NewCentre,
  ) -> impl Future<Output = Result<Centre, Self::Error>> + Send + '_;

  /// Delete a centre with its offerings and coarse links. Returns whether a
  /// centre was removed.
  fn delete_centre(
    &self,
    centre_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Overwrite a centre's quality status and notes. Returns `false` if the
  /// centre does not exist.
  fn update_quality(
    &self,
    centre_id: Uuid,
    quality: Quality,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reference data ────────────────────────────────────────────────────

  /// Level and subject names are stored whitespace-collapsed
  /// ([`reference_name`](crate::offering::reference_name)).
  fn upsert_level<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Level, Self::Error>> + Send + 'a;

  fn upsert_subject<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + 'a;

  // ── Offerings and coarse links ────────────────────────────────────────

  /// Record an atomic offering. Returns `false` if it already existed.
  fn add_offering(
    &self,
    centre_id: Uuid,
    level_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the link already existed.
  fn link_level(
    &self,
    centre_id: Uuid,
    level_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the link already existed.
  fn link_subject(
    &self,
    centre_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_centre(
    &self,
    centre_id: Uuid,
  ) -> impl Future<Output = Result<Option<CentreView>, Self::Error>> + Send + '_;

  /// One page of centres matching `query`, ordered by name then location,
  /// with the total match count.
  fn search_centres<'a>(
    &'a self,
    query: &'a CentreQuery,
  ) -> impl Future<Output = Result<CentrePage, Self::Error>> + Send + 'a;

  fn centre_count(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn offering_count(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Distinct level names that occur in at least one offering.
  fn offered_levels(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Distinct subject names that occur in at least one offering.
  fn offered_subjects(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Remove every centre, offering, link, level and subject.
  fn wipe(
    &self,
  ) -> impl Future<Output = Result<WipeSummary, Self::Error>> + Send + '_;
}
