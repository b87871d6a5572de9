//! End-to-end ingestion tests against the in-memory and SQLite stores.

use std::{io::Write as _, sync::Mutex};

use tuition_core::{
  centre::{Centre, CentrePage, CentreView, DedupeKey, NewCentre, WipeSummary},
  filter::CentreQuery,
  memory::MemoryStore,
  offering::{Level, OfferingPair, Subject},
  quality::{FlagKind, Quality, QualityStatus},
  store::DirectoryStore,
};
use tuition_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  IngestError, IngestOptions, IngestSource, ingest,
  report::SkipReason,
  source::{CENTRE_REQUIREMENTS, OFFERING_REQUIREMENTS, Table, read_table, read_table_path},
};

fn centres(csv: &str) -> Table {
  read_table(csv.as_bytes(), CENTRE_REQUIREMENTS, "centres").unwrap()
}

fn only_centres(csv: &str) -> IngestSource {
  IngestSource { centres: centres(csv), offerings: None }
}

async fn all_centres<S: DirectoryStore>(store: &S) -> Vec<CentreView> {
  let query = CentreQuery { limit: 100, ..Default::default() };
  store.search_centres(&query).await.unwrap().centres
}

const CENTRES: &str = "\
,,,,,,
centre_name,branch_name,address,area,website_url,whatsapp_number,offerings
Bright Minds,Tampines,1 Tampines Ave,East,https://bm.sg,91234567,Mathematics|Sec1-Sec2; Physics|J1
Clever Kids,,,Bedok,https://ck.sg,,English|P1-P6
Mystery Centre,,,Marine Parade,https://mc.sg,,Chemistry|UNKNOWN; Biology|Sec3
,,,East,,,
Lost Centre,,,,,,Math|P1
";

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn bright_minds_yields_three_atomic_offerings() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let csv = "centre_name,branch_name,address,website_url,offerings\n\
             Bright Minds,Tampines,1 Tampines Ave,https://bm.sg,\
             Mathematics|Sec1-Sec2; Physics|J1\n";
  let report = ingest(&store, only_centres(csv), &IngestOptions::default())
    .await
    .unwrap();

  assert_eq!(report.inserted, 1);
  assert_eq!(report.status_ok, 1);
  assert_eq!(report.offerings_added, 3);
  assert_eq!(store.offering_count().await.unwrap(), 3);

  let view = &all_centres(&store).await[0];
  assert_eq!(view.centre.name, "Bright Minds (Tampines)");
  assert_eq!(view.centre.quality_status, QualityStatus::Ok);
  assert_eq!(
    view.centre.quality_notes.as_deref(),
    Some("sourceDataset=database_ready_v1")
  );
  let pairs: Vec<_> = view
    .offerings
    .iter()
    .map(|o| (o.level.as_str(), o.subject.as_str()))
    .collect();
  assert_eq!(pairs, [
    ("Secondary 1", "Mathematics"),
    ("Secondary 2", "Mathematics"),
    ("JC 1", "Physics"),
  ]);
}

#[tokio::test]
async fn report_counts_every_outcome() {
  let store = MemoryStore::new();
  let report = ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap();

  assert_eq!(report.total_rows, 5);
  assert_eq!(report.candidates, 3);
  assert_eq!(report.inserted, 3);
  assert_eq!(report.skipped(SkipReason::MissingName), 1);
  assert_eq!(report.skipped(SkipReason::MissingLocation), 1);
  assert_eq!(report.errored, 0);
  assert_eq!(report.status_ok, 2);
  assert_eq!(report.status_needs_review, 1);
  assert_eq!(report.flags.get(&FlagKind::UnknownLevels), Some(&1));
  assert_eq!(report.offerings_added, 3 + 6 + 1);
}

#[tokio::test]
async fn second_run_inserts_nothing() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let options = IngestOptions::default();
  ingest(&store, only_centres(CENTRES), &options).await.unwrap();
  let centres_before = store.centre_count().await.unwrap();
  let offerings_before = store.offering_count().await.unwrap();

  let again = ingest(&store, only_centres(CENTRES), &options).await.unwrap();
  assert_eq!(again.inserted, 0);
  assert_eq!(again.skipped(SkipReason::Duplicate), 3);
  assert_eq!(again.offerings_added, 0);
  assert_eq!(again.errored, 0);
  assert_eq!(store.centre_count().await.unwrap(), centres_before);
  assert_eq!(store.offering_count().await.unwrap(), offerings_before);
}

#[tokio::test]
async fn unknown_levels_are_kept_for_review() {
  let store = MemoryStore::new();
  ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap();

  let views = all_centres(&store).await;
  let mystery = views
    .iter()
    .find(|v| v.centre.name == "Mystery Centre")
    .unwrap();
  assert_eq!(mystery.centre.quality_status, QualityStatus::NeedsReview);
  assert!(
    mystery
      .centre
      .quality_notes
      .as_deref()
      .unwrap()
      .contains("UNKNOWN")
  );
  assert_eq!(mystery.offerings.len(), 1);
  let subjects: Vec<_> = mystery.subjects.iter().map(|s| s.name.as_str()).collect();
  assert_eq!(subjects, ["Biology", "Chemistry"]);
}

#[tokio::test]
async fn default_area_supplies_missing_location() {
  let store = MemoryStore::new();
  let options = IngestOptions {
    default_area: Some("Marine Parade".into()),
    ..Default::default()
  };
  let report = ingest(&store, only_centres(CENTRES), &options).await.unwrap();
  assert_eq!(report.inserted, 4);
  assert_eq!(report.skipped(SkipReason::MissingLocation), 0);
}

#[tokio::test]
async fn offerings_sheet_fills_existing_centres() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let options = IngestOptions::default();
  let plain = "centre_name,branch_name,area,website_url\n\
               Alpha,Bedok,East,https://a.sg\n\
               Beta,,West,https://b.sg\n";
  let first = ingest(&store, only_centres(plain), &options).await.unwrap();
  assert_eq!(first.status_ok, 2);
  assert_eq!(store.offering_count().await.unwrap(), 0);

  let sheet = "centre_name,branch_name,area,level,subject\n\
               Alpha,Bedok,East,Secondary 3,Pure Physics\n\
               Alpha,Bedok,,J1,Economics\n\
               Beta,,West,P5,Maths\n\
               Gamma,,North,P1,English\n";
  let source = IngestSource {
    centres:   centres(plain),
    offerings: Some(
      read_table(sheet.as_bytes(), OFFERING_REQUIREMENTS, "offerings").unwrap(),
    ),
  };
  let second = ingest(&store, source, &options).await.unwrap();
  assert_eq!(second.inserted, 0);
  assert_eq!(second.skipped(SkipReason::Duplicate), 2);
  assert_eq!(second.offerings_added, 3);
  assert_eq!(second.orphan_offering_rows, 1);

  let views = all_centres(&store).await;
  let alpha = views.iter().find(|v| v.centre.name == "Alpha (Bedok)").unwrap();
  let pairs: Vec<_> = alpha
    .offerings
    .iter()
    .map(|o| (o.level.as_str(), o.subject.as_str()))
    .collect();
  assert_eq!(pairs, [("Secondary 3", "Physics"), ("JC 1", "Economics")]);
}

#[tokio::test]
async fn reads_source_from_disk() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  file.write_all(CENTRES.as_bytes()).unwrap();
  let table = read_table_path(file.path(), CENTRE_REQUIREMENTS).unwrap();
  assert_eq!(table.records.len(), 5);

  let store = MemoryStore::new();
  let source = IngestSource { centres: table, offerings: None };
  let report = ingest(&store, source, &IngestOptions::default()).await.unwrap();
  assert_eq!(report.inserted, 3);
}

#[tokio::test]
async fn bright_minds_without_branch_keeps_its_plain_name() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let csv = "centre_name,branch_name,area,offerings\n\
             Bright Minds,,Jurong East,\"Mathematics|Sec1-Sec2; Physics|J1\"\n";
  let report = ingest(&store, only_centres(csv), &IngestOptions::default())
    .await
    .unwrap();
  assert_eq!(report.inserted, 1);

  let views = all_centres(&store).await;
  assert_eq!(views.len(), 1);
  let view = &views[0];
  assert_eq!(view.centre.name, "Bright Minds");
  assert_eq!(view.centre.location, "Jurong East");
  assert_eq!(view.centre.quality_status, QualityStatus::Ok);
  assert_eq!(view.offerings, [
    OfferingPair::new("Secondary 1", "Mathematics"),
    OfferingPair::new("Secondary 2", "Mathematics"),
    OfferingPair::new("JC 1", "Physics"),
  ]);
}

#[tokio::test]
async fn merged_offerings_raise_an_existing_centres_quality() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let options = IngestOptions::default();
  ingest(&store, only_centres("centre_name,area\nAlpha,East\n"), &options)
    .await
    .unwrap();
  let before = all_centres(&store).await;
  assert_eq!(before[0].centre.quality_status, QualityStatus::Ok);

  let csv = "centre_name,area,offerings\n\
             Alpha,East,\"Chemistry|UNKNOWN; Fractions|P3\"\n";
  let report = ingest(&store, only_centres(csv), &options).await.unwrap();
  assert_eq!(report.skipped(SkipReason::Duplicate), 1);
  assert_eq!(report.requalified, 1);

  let after = all_centres(&store).await;
  let centre = &after[0].centre;
  assert_eq!(centre.quality_status, QualityStatus::NeedsReview);
  let notes = centre.quality_notes.as_deref().unwrap();
  assert!(notes.starts_with("sourceDataset=database_ready_v1"));
  assert!(notes.contains("Contains UNKNOWN level ranges"));
  assert!(notes.contains("Non-subject entries filtered: Fractions"));
  assert_eq!(after[0].subjects[0].name, "Chemistry");

  let again = ingest(&store, only_centres(csv), &options).await.unwrap();
  assert_eq!(again.requalified, 0);
  let unchanged = all_centres(&store).await;
  assert_eq!(unchanged[0].centre.quality_notes.as_deref(), Some(notes));
}

#[tokio::test]
async fn dry_run_writes_nothing_and_predicts_a_real_run() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let dry_options = IngestOptions { dry_run: true, ..Default::default() };

  let dry = ingest(&store, only_centres(CENTRES), &dry_options).await.unwrap();
  assert!(dry.dry_run);
  assert_eq!(store.centre_count().await.unwrap(), 0);
  assert_eq!(store.offering_count().await.unwrap(), 0);
  assert!(store.offered_subjects().await.unwrap().is_empty());

  let real = ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap();
  assert_eq!(dry.inserted, real.inserted);
  assert_eq!(dry.skipped, real.skipped);
  assert_eq!(dry.status_needs_review, real.status_needs_review);
  assert_eq!(dry.flags, real.flags);
  assert_eq!(dry.offerings_added, real.offerings_added);
  assert_eq!(dry.level_links_added, real.level_links_added);
  assert_eq!(dry.subject_links_added, real.subject_links_added);

  let centres = store.centre_count().await.unwrap();
  let offerings = store.offering_count().await.unwrap();
  let rerun = ingest(&store, only_centres(CENTRES), &dry_options).await.unwrap();
  assert_eq!(rerun.inserted, 0);
  assert_eq!(rerun.skipped(SkipReason::Duplicate), real.inserted);
  assert_eq!(store.centre_count().await.unwrap(), centres);
  assert_eq!(store.offering_count().await.unwrap(), offerings);
}

#[tokio::test]
async fn dry_run_counts_in_batch_duplicates_once() {
  let store = MemoryStore::new();
  let csv = "centre_name,area\nAlpha,East\nAlpha,East\n";
  let options = IngestOptions { dry_run: true, ..Default::default() };
  let report = ingest(&store, only_centres(csv), &options).await.unwrap();
  assert_eq!(report.inserted, 1);
  assert_eq!(report.skipped(SkipReason::Duplicate), 1);
  assert_eq!(store.centre_count().await.unwrap(), 0);
}

// ─── Failure handling ────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum FlakyError {
  #[error(transparent)]
  Core(#[from] tuition_core::Error),
  #[error("injected failure")]
  Injected,
}

/// A store that can refuse all reads, reject one centre's insert, reject
/// every offering, or hide a stored centre from its first lookup.
#[derive(Default)]
struct FlakyStore {
  inner:            MemoryStore,
  unreachable:      bool,
  reject:           Option<String>,
  reject_offerings: bool,
  hide_once:        Mutex<Option<String>>,
}

impl DirectoryStore for FlakyStore {
  type Error = FlakyError;

  fn is_duplicate(error: &FlakyError) -> bool {
    matches!(error, FlakyError::Core(e) if MemoryStore::is_duplicate(e))
  }

  async fn find_centre(&self, key: &DedupeKey) -> Result<Option<Centre>, FlakyError> {
    let hidden = {
      let mut hide = self.hide_once.lock().unwrap();
      hide.take_if(|name| *name == key.name).is_some()
    };
    if hidden {
      return Ok(None);
    }
    Ok(self.inner.find_centre(key).await?)
  }

  async fn insert_centre(&self, input: NewCentre) -> Result<Centre, FlakyError> {
    if self.reject.as_deref() == Some(input.name.as_str()) {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.insert_centre(input).await?)
  }

  async fn delete_centre(&self, centre_id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.delete_centre(centre_id).await?)
  }

  async fn update_quality(
    &self,
    centre_id: Uuid,
    quality: Quality,
  ) -> Result<bool, FlakyError> {
    Ok(self.inner.update_quality(centre_id, quality).await?)
  }

  async fn upsert_level(&self, name: &str) -> Result<Level, FlakyError> {
    Ok(self.inner.upsert_level(name).await?)
  }

  async fn upsert_subject(&self, name: &str) -> Result<Subject, FlakyError> {
    Ok(self.inner.upsert_subject(name).await?)
  }

  async fn add_offering(
    &self,
    centre_id: Uuid,
    level_id: Uuid,
    subject_id: Uuid,
  ) -> Result<bool, FlakyError> {
    if self.reject_offerings {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.add_offering(centre_id, level_id, subject_id).await?)
  }

  async fn link_level(&self, centre_id: Uuid, level_id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.link_level(centre_id, level_id).await?)
  }

  async fn link_subject(&self, centre_id: Uuid, subject_id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.link_subject(centre_id, subject_id).await?)
  }

  async fn get_centre(&self, centre_id: Uuid) -> Result<Option<CentreView>, FlakyError> {
    Ok(self.inner.get_centre(centre_id).await?)
  }

  async fn search_centres(&self, query: &CentreQuery) -> Result<CentrePage, FlakyError> {
    Ok(self.inner.search_centres(query).await?)
  }

  async fn centre_count(&self) -> Result<u64, FlakyError> {
    if self.unreachable {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.centre_count().await?)
  }

  async fn offering_count(&self) -> Result<u64, FlakyError> {
    Ok(self.inner.offering_count().await?)
  }

  async fn offered_levels(&self) -> Result<Vec<String>, FlakyError> {
    Ok(self.inner.offered_levels().await?)
  }

  async fn offered_subjects(&self) -> Result<Vec<String>, FlakyError> {
    Ok(self.inner.offered_subjects().await?)
  }

  async fn wipe(&self) -> Result<WipeSummary, FlakyError> {
    Ok(self.inner.wipe().await?)
  }
}

#[tokio::test]
async fn unreachable_store_is_fatal() {
  let store = FlakyStore { unreachable: true, ..Default::default() };
  let err = ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, IngestError::StoreUnavailable(_)));
}

#[tokio::test]
async fn one_failed_row_does_not_stop_the_batch() {
  let store = FlakyStore {
    reject: Some("Clever Kids".into()),
    ..Default::default()
  };
  let report = ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap();

  assert_eq!(report.inserted, 2);
  assert_eq!(report.errored, 1);
  assert_eq!(report.row_errors[0].row, 4);
  assert_eq!(report.row_errors[0].centre.as_deref(), Some("Clever Kids"));
  assert_eq!(store.inner.centre_count().await.unwrap(), 2);
}

#[tokio::test]
async fn failed_offerings_leave_the_centre_and_record_an_error() {
  let store = FlakyStore { reject_offerings: true, ..Default::default() };
  let report = ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap();

  assert_eq!(report.inserted, 3);
  assert_eq!(report.errored, 3);
  assert!(
    report
      .row_errors
      .iter()
      .all(|e| e.message.starts_with("offerings incomplete"))
  );
  assert_eq!(report.offerings_added, 0);
  assert_eq!(store.inner.centre_count().await.unwrap(), 3);
  assert_eq!(store.inner.offering_count().await.unwrap(), 0);
}

#[tokio::test]
async fn insert_losing_a_race_counts_as_duplicate() {
  let store = FlakyStore {
    hide_once: Mutex::new(Some("Clever Kids".into())),
    ..Default::default()
  };
  store
    .inner
    .insert_centre(NewCentre {
      name:            "Clever Kids".into(),
      location:        "Bedok".into(),
      whatsapp_number: None,
      website:         None,
      quality_status:  QualityStatus::Ok,
      quality_notes:   None,
    })
    .await
    .unwrap();

  let report = ingest(&store, only_centres(CENTRES), &IngestOptions::default())
    .await
    .unwrap();
  assert_eq!(report.errored, 0);
  assert_eq!(report.inserted, 2);
  assert_eq!(report.skipped(SkipReason::Duplicate), 1);

  let clever = all_centres(&store.inner)
    .await
    .into_iter()
    .find(|v| v.centre.name == "Clever Kids")
    .unwrap();
  assert_eq!(clever.offerings.len(), 6);
}
