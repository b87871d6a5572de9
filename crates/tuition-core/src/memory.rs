//! [`MemoryStore`]: an in-process [`DirectoryStore`].
//!
//! Filtering runs application-side through [`OfferingFilter::matches`], the
//! same predicate the SQL backend expresses as an `EXISTS` clause. Used in
//! tests and for small datasets that do not need a database file.

use std::{
  collections::{BTreeSet, HashMap},
  sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  centre::{Centre, CentrePage, CentreView, DedupeKey, NewCentre, WipeSummary},
  filter::{CentreQuery, OfferingFilter},
  level::compare_levels,
  offering::{Level, OfferingPair, Subject, reference_name},
  quality::Quality,
  store::DirectoryStore,
};

#[derive(Debug, Default)]
struct Tables {
  centres:         Vec<Centre>,
  levels:          Vec<Level>,
  subjects:        Vec<Subject>,
  /// `(centre, level, subject)`
  offerings:       BTreeSet<(Uuid, Uuid, Uuid)>,
  centre_levels:   BTreeSet<(Uuid, Uuid)>,
  centre_subjects: BTreeSet<(Uuid, Uuid)>,
}

impl Tables {
  fn centre(&self, id: Uuid) -> Option<&Centre> {
    self.centres.iter().find(|c| c.centre_id == id)
  }

  fn pairs(&self, centre_id: Uuid) -> Vec<OfferingPair> {
    let levels: HashMap<Uuid, &str> = self
      .levels
      .iter()
      .map(|l| (l.level_id, l.name.as_str()))
      .collect();
    let subjects: HashMap<Uuid, &str> = self
      .subjects
      .iter()
      .map(|s| (s.subject_id, s.name.as_str()))
      .collect();

    let mut pairs: Vec<OfferingPair> = self
      .offerings
      .iter()
      .filter(|(c, ..)| *c == centre_id)
      .filter_map(|(_, l, s)| {
        Some(OfferingPair::new(*levels.get(l)?, *subjects.get(s)?))
      })
      .collect();
    pairs.sort_by(|a, b| {
      compare_levels(&a.level, &b.level).then_with(|| a.subject.cmp(&b.subject))
    });
    pairs
  }

  fn view(&self, centre: &Centre) -> CentreView {
    let id = centre.centre_id;
    let mut levels: Vec<Level> = self
      .levels
      .iter()
      .filter(|l| self.centre_levels.contains(&(id, l.level_id)))
      .cloned()
      .collect();
    levels.sort_by(|a, b| compare_levels(&a.name, &b.name));
    let mut subjects: Vec<Subject> = self
      .subjects
      .iter()
      .filter(|s| self.centre_subjects.contains(&(id, s.subject_id)))
      .cloned()
      .collect();
    subjects.sort_by(|a, b| a.name.cmp(&b.name));

    CentreView {
      centre: centre.clone(),
      levels,
      subjects,
      offerings: self.pairs(id),
    }
  }

  fn matches(&self, centre: &Centre, query: &CentreQuery) -> bool {
    let text_ok = query.search_term().is_none_or(|term| {
      let term = term.to_lowercase();
      centre.name.to_lowercase().contains(&term)
        || centre.location.to_lowercase().contains(&term)
    });
    text_ok
      && query
        .filter
        .as_ref()
        .is_none_or(|f: &OfferingFilter| f.matches(&self.pairs(centre.centre_id)))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An in-memory directory. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
    self.tables.read().map_err(|_| Error::LockPoisoned)
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
    self.tables.write().map_err(|_| Error::LockPoisoned)
  }
}

impl DirectoryStore for MemoryStore {
  type Error = Error;

  fn is_duplicate(error: &Error) -> bool {
    matches!(error, Error::DuplicateCentre { .. })
  }

  async fn find_centre(&self, key: &DedupeKey) -> Result<Option<Centre>> {
    let tables = self.read()?;
    Ok(
      tables
        .centres
        .iter()
        .find(|c| c.name == key.name && c.location == key.location)
        .cloned(),
    )
  }

  async fn insert_centre(&self, input: NewCentre) -> Result<Centre> {
    let mut tables = self.write()?;
    if tables
      .centres
      .iter()
      .any(|c| c.name == input.name && c.location == input.location)
    {
      return Err(Error::DuplicateCentre {
        name:     input.name,
        location: input.location,
      });
    }
    let now = Utc::now();
    let centre = Centre {
      centre_id:       Uuid::new_v4(),
      name:            input.name,
      location:        input.location,
      whatsapp_number: input.whatsapp_number,
      website:         input.website,
      quality_status:  input.quality_status,
      quality_notes:   input.quality_notes,
      created_at:      now,
      updated_at:      now,
    };
    tables.centres.push(centre.clone());
    Ok(centre)
  }

  async fn delete_centre(&self, centre_id: Uuid) -> Result<bool> {
    let mut tables = self.write()?;
    let before = tables.centres.len();
    tables.centres.retain(|c| c.centre_id != centre_id);
    if tables.centres.len() == before {
      return Ok(false);
    }
    tables.offerings.retain(|(c, ..)| *c != centre_id);
    tables.centre_levels.retain(|(c, _)| *c != centre_id);
    tables.centre_subjects.retain(|(c, _)| *c != centre_id);
    Ok(true)
  }

  async fn update_quality(
    &self,
    centre_id: Uuid,
    quality: Quality,
  ) -> Result<bool> {
    let mut tables = self.write()?;
    let Some(centre) = tables.centres.iter_mut().find(|c| c.centre_id == centre_id)
    else {
      return Ok(false);
    };
    centre.quality_status = quality.status;
    centre.quality_notes = quality.notes;
    centre.updated_at = Utc::now();
    Ok(true)
  }

  async fn upsert_level(&self, name: &str) -> Result<Level> {
    let name = reference_name(name);
    let mut tables = self.write()?;
    if let Some(level) = tables.levels.iter().find(|l| l.name == name) {
      return Ok(level.clone());
    }
    let level = Level { level_id: Uuid::new_v4(), name };
    tables.levels.push(level.clone());
    Ok(level)
  }

  async fn upsert_subject(&self, name: &str) -> Result<Subject> {
    let name = reference_name(name);
    let mut tables = self.write()?;
    if let Some(subject) = tables.subjects.iter().find(|s| s.name == name) {
      return Ok(subject.clone());
    }
    let subject = Subject { subject_id: Uuid::new_v4(), name };
    tables.subjects.push(subject.clone());
    Ok(subject)
  }

  async fn add_offering(
    &self,
    centre_id: Uuid,
    level_id: Uuid,
    subject_id: Uuid,
  ) -> Result<bool> {
    let mut tables = self.write()?;
    if tables.centre(centre_id).is_none() {
      return Err(Error::CentreNotFound(centre_id));
    }
    if !tables.levels.iter().any(|l| l.level_id == level_id) {
      return Err(Error::LevelNotFound(level_id));
    }
    if !tables.subjects.iter().any(|s| s.subject_id == subject_id) {
      return Err(Error::SubjectNotFound(subject_id));
    }
    Ok(tables.offerings.insert((centre_id, level_id, subject_id)))
  }

  async fn link_level(&self, centre_id: Uuid, level_id: Uuid) -> Result<bool> {
    let mut tables = self.write()?;
    if tables.centre(centre_id).is_none() {
      return Err(Error::CentreNotFound(centre_id));
    }
    if !tables.levels.iter().any(|l| l.level_id == level_id) {
      return Err(Error::LevelNotFound(level_id));
    }
    Ok(tables.centre_levels.insert((centre_id, level_id)))
  }

  async fn link_subject(
    &self,
    centre_id: Uuid,
    subject_id: Uuid,
  ) -> Result<bool> {
    let mut tables = self.write()?;
    if tables.centre(centre_id).is_none() {
      return Err(Error::CentreNotFound(centre_id));
    }
    if !tables.subjects.iter().any(|s| s.subject_id == subject_id) {
      return Err(Error::SubjectNotFound(subject_id));
    }
    Ok(tables.centre_subjects.insert((centre_id, subject_id)))
  }

  async fn get_centre(&self, centre_id: Uuid) -> Result<Option<CentreView>> {
    let tables = self.read()?;
    Ok(tables.centre(centre_id).map(|c| tables.view(c)))
  }

  async fn search_centres(&self, query: &CentreQuery) -> Result<CentrePage> {
    let tables = self.read()?;
    let mut matched: Vec<&Centre> = tables
      .centres
      .iter()
      .filter(|c| tables.matches(c, query))
      .collect();
    matched.sort_by(|a, b| {
      a.name.cmp(&b.name).then_with(|| a.location.cmp(&b.location))
    });

    let total = matched.len() as u64;
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let centres = matched
      .into_iter()
      .skip(offset)
      .take(query.limit as usize)
      .map(|c| tables.view(c))
      .collect();
    Ok(CentrePage { centres, total })
  }

  async fn centre_count(&self) -> Result<u64> {
    Ok(self.read()?.centres.len() as u64)
  }

  async fn offering_count(&self) -> Result<u64> {
    Ok(self.read()?.offerings.len() as u64)
  }

  async fn offered_levels(&self) -> Result<Vec<String>> {
    let tables = self.read()?;
    let ids: BTreeSet<Uuid> = tables.offerings.iter().map(|(_, l, _)| *l).collect();
    let mut names: Vec<String> = tables
      .levels
      .iter()
      .filter(|l| ids.contains(&l.level_id))
      .map(|l| l.name.clone())
      .collect();
    names.sort_by(|a, b| compare_levels(a, b));
    Ok(names)
  }

  async fn offered_subjects(&self) -> Result<Vec<String>> {
    let tables = self.read()?;
    let ids: BTreeSet<Uuid> = tables.offerings.iter().map(|(.., s)| *s).collect();
    let mut names: Vec<String> = tables
      .subjects
      .iter()
      .filter(|s| ids.contains(&s.subject_id))
      .map(|s| s.name.clone())
      .collect();
    names.sort();
    Ok(names)
  }

  async fn wipe(&self) -> Result<WipeSummary> {
    let mut tables = self.write()?;
    let summary = WipeSummary {
      offerings:       tables.offerings.len() as u64,
      centre_levels:   tables.centre_levels.len() as u64,
      centre_subjects: tables.centre_subjects.len() as u64,
      centres:         tables.centres.len() as u64,
      levels:          tables.levels.len() as u64,
      subjects:        tables.subjects.len() as u64,
    };
    *tables = Tables::default();
    Ok(summary)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{filter::build_filter, quality::QualityStatus};

  fn new_centre(name: &str, location: &str) -> NewCentre {
    NewCentre {
      name:            name.into(),
      location:        location.into(),
      whatsapp_number: None,
      website:         None,
      quality_status:  QualityStatus::Ok,
      quality_notes:   None,
    }
  }

  async fn offer(store: &MemoryStore, centre: Uuid, level: &str, subject: &str) {
    let level = store.upsert_level(level).await.unwrap();
    let subject = store.upsert_subject(subject).await.unwrap();
    store
      .add_offering(centre, level.level_id, subject.subject_id)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn dedupe_key_is_unique() {
    let store = MemoryStore::new();
    store.insert_centre(new_centre("A", "East")).await.unwrap();
    let err = store.insert_centre(new_centre("A", "East")).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateCentre { .. }));
    store.insert_centre(new_centre("A", "West")).await.unwrap();
    assert_eq!(store.centre_count().await.unwrap(), 2);
  }

  #[tokio::test]
  async fn duplicate_insert_is_recognised() {
    let store = MemoryStore::new();
    store.insert_centre(new_centre("A", "East")).await.unwrap();
    let err = store.insert_centre(new_centre("A", "East")).await.unwrap_err();
    assert!(MemoryStore::is_duplicate(&err));
    assert!(!MemoryStore::is_duplicate(&Error::LockPoisoned));
  }

  #[tokio::test]
  async fn reference_names_are_collapsed_on_upsert() {
    let store = MemoryStore::new();
    let level = store.upsert_level(" JC  1").await.unwrap();
    assert_eq!(level.name, "JC 1");
    assert_eq!(store.upsert_level("JC 1").await.unwrap(), level);
    let subject = store.upsert_subject("Physics ").await.unwrap();
    assert_eq!(subject.name, "Physics");
  }

  #[tokio::test]
  async fn quality_can_be_rewritten() {
    let store = MemoryStore::new();
    let centre = store.insert_centre(new_centre("A", "East")).await.unwrap();
    let quality = Quality {
      status: QualityStatus::NeedsReview,
      notes:  Some("Contains UNKNOWN level ranges".into()),
    };
    assert!(store.update_quality(centre.centre_id, quality).await.unwrap());

    let view = store.get_centre(centre.centre_id).await.unwrap().unwrap();
    assert_eq!(view.centre.quality_status, QualityStatus::NeedsReview);
    assert_eq!(
      view.centre.quality_notes.as_deref(),
      Some("Contains UNKNOWN level ranges")
    );
    assert!(
      !store
        .update_quality(Uuid::new_v4(), Quality {
          status: QualityStatus::Ok,
          notes:  None,
        })
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn same_row_filter_excludes_split_offerings() {
    let store = MemoryStore::new();
    let split = store.insert_centre(new_centre("Split", "X")).await.unwrap();
    let whole = store.insert_centre(new_centre("Whole", "X")).await.unwrap();
    offer(&store, split.centre_id, "Secondary 1", "Physics").await;
    offer(&store, split.centre_id, "JC 1", "Chemistry").await;
    offer(&store, whole.centre_id, "JC 1", "Physics").await;

    let query = CentreQuery {
      filter: build_filter(["JC 1"], ["Physics"]),
      ..Default::default()
    };
    let page = store.search_centres(&query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.centres[0].centre.name, "Whole");
  }

  #[tokio::test]
  async fn delete_cascades_to_offerings() {
    let store = MemoryStore::new();
    let centre = store.insert_centre(new_centre("A", "X")).await.unwrap();
    offer(&store, centre.centre_id, "Primary 1", "English").await;
    assert!(store.delete_centre(centre.centre_id).await.unwrap());
    assert_eq!(store.offering_count().await.unwrap(), 0);
    assert!(!store.delete_centre(centre.centre_id).await.unwrap());
  }

  #[tokio::test]
  async fn offering_is_insert_or_ignore() {
    let store = MemoryStore::new();
    let centre = store.insert_centre(new_centre("A", "X")).await.unwrap();
    let level = store.upsert_level("Primary 1").await.unwrap();
    let again = store.upsert_level("Primary 1").await.unwrap();
    assert_eq!(level, again);
    let subject = store.upsert_subject("English").await.unwrap();
    assert!(
      store
        .add_offering(centre.centre_id, level.level_id, subject.subject_id)
        .await
        .unwrap()
    );
    assert!(
      !store
        .add_offering(centre.centre_id, level.level_id, subject.subject_id)
        .await
        .unwrap()
    );
  }
}
