//! [`SqliteStore`]: the SQLite implementation of [`DirectoryStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, ffi, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use tuition_core::{
  centre::{Centre, CentrePage, CentreView, DedupeKey, NewCentre, WipeSummary},
  filter::CentreQuery,
  level::compare_levels,
  offering::{Level, Subject, reference_name},
  quality::Quality,
  store::DirectoryStore,
};

use crate::{
  Error, Result,
  encode::{
    CENTRE_COLUMNS, RawCentre, RawCentreView, decode_uuid, encode_dt,
    encode_status, encode_uuid,
  },
  query::{count_statement, page_statement},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tuition directory backed by a single SQLite file.
///
/// Cloning shares the inner reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_or_ignore(
    &self,
    sql: &'static str,
    ids: Vec<String>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, params_from_iter(ids.iter()))?))
      .await?;
    Ok(changed > 0)
  }

  /// Upsert a name into `levels` or `subjects` and return `(id, name)`.
  async fn upsert_named(
    &self,
    table: &'static str,
    id_column: &'static str,
    name: &str,
  ) -> Result<(Uuid, String)> {
    let new_id = encode_uuid(Uuid::new_v4());
    let name = reference_name(name);
    let lookup = name.clone();

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO {table} ({id_column}, name) VALUES (?1, ?2) \
             ON CONFLICT(name) DO NOTHING"
          ),
          rusqlite::params![new_id, lookup],
        )?;
        Ok(
          conn
            .query_row(
              &format!("SELECT {id_column}, name FROM {table} WHERE name = ?1"),
              rusqlite::params![lookup],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let (id, name) = row.ok_or(Error::MissingAfterUpsert { table, name })?;
    Ok((decode_uuid(&id)?, name))
  }
}

/// Read a centre's coarse links and offerings. Runs on the connection thread.
fn load_view(
  conn: &rusqlite::Connection,
  centre: RawCentre,
) -> rusqlite::Result<RawCentreView> {
  let id = centre.centre_id.clone();

  let levels = conn
    .prepare_cached(
      "SELECT l.level_id, l.name FROM centre_levels cl
       JOIN levels l ON l.level_id = cl.level_id
       WHERE cl.centre_id = ?1",
    )?
    .query_map([&id], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let subjects = conn
    .prepare_cached(
      "SELECT s.subject_id, s.name FROM centre_subjects cs
       JOIN subjects s ON s.subject_id = cs.subject_id
       WHERE cs.centre_id = ?1",
    )?
    .query_map([&id], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let offerings = conn
    .prepare_cached(
      "SELECT l.name, s.name FROM offerings o
       JOIN levels l   ON l.level_id   = o.level_id
       JOIN subjects s ON s.subject_id = o.subject_id
       WHERE o.centre_id = ?1",
    )?
    .query_map([&id], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(RawCentreView { centre, levels, subjects, offerings })
}

impl DirectoryStore for SqliteStore {
  type Error = Error;

  fn is_duplicate(error: &Error) -> bool {
    matches!(
      error,
      Error::Core(tuition_core::Error::DuplicateCentre { .. })
    )
  }

  // ── Centres ───────────────────────────────────────────────────────────────

  async fn find_centre(&self, key: &DedupeKey) -> Result<Option<Centre>> {
    let name = key.name.clone();
    let location = key.location.clone();

    let raw: Option<RawCentre> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CENTRE_COLUMNS} FROM centres c
                 WHERE c.name = ?1 AND c.location = ?2"
              ),
              rusqlite::params![name, location],
              RawCentre::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCentre::into_centre).transpose()
  }

  async fn insert_centre(&self, input: NewCentre) -> Result<Centre> {
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

    let id_str = encode_uuid(centre.centre_id);
    let at_str = encode_dt(now);
    let status = encode_status(centre.quality_status);
    let row = (
      centre.name.clone(),
      centre.location.clone(),
      centre.whatsapp_number.clone(),
      centre.website.clone(),
      centre.quality_notes.clone(),
    );

    let inserted = self
      .conn
      .call(move |conn| {
        let (name, location, whatsapp, website, notes) = row;
        let result = conn.execute(
          "INSERT INTO centres (centre_id, name, location, whatsapp_number,
             website, quality_status, quality_notes, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str, name, location, whatsapp, website, status, notes, at_str
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(
        tuition_core::Error::DuplicateCentre {
          name:     centre.name,
          location: centre.location,
        }
        .into(),
      );
    }
    debug!(centre_id = %centre.centre_id, name = %centre.name, "inserted centre");
    Ok(centre)
  }

  async fn delete_centre(&self, centre_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(centre_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM centres WHERE centre_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn update_quality(
    &self,
    centre_id: Uuid,
    quality: Quality,
  ) -> Result<bool> {
    let id_str = encode_uuid(centre_id);
    let at_str = encode_dt(Utc::now());
    let status = encode_status(quality.status);
    let notes = quality.notes;
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE centres
           SET quality_status = ?2, quality_notes = ?3, updated_at = ?4
           WHERE centre_id = ?1",
          rusqlite::params![id_str, status, notes, at_str],
        )?)
      })
      .await?;
    Ok(updated > 0)
  }

  // ── Reference data ────────────────────────────────────────────────────────

  async fn upsert_level(&self, name: &str) -> Result<Level> {
    let (level_id, name) = self.upsert_named("levels", "level_id", name).await?;
    Ok(Level { level_id, name })
  }

  async fn upsert_subject(&self, name: &str) -> Result<Subject> {
    let (subject_id, name) =
      self.upsert_named("subjects", "subject_id", name).await?;
    Ok(Subject { subject_id, name })
  }

  // ── Offerings and coarse links ────────────────────────────────────────────

  async fn add_offering(
    &self,
    centre_id:  Uuid,
    level_id:   Uuid,
    subject_id: Uuid,
  ) -> Result<bool> {
    self
      .insert_or_ignore(
        "INSERT OR IGNORE INTO offerings (centre_id, level_id, subject_id)
         VALUES (?1, ?2, ?3)",
        vec![
          encode_uuid(centre_id),
          encode_uuid(level_id),
          encode_uuid(subject_id),
        ],
      )
      .await
  }

  async fn link_level(&self, centre_id: Uuid, level_id: Uuid) -> Result<bool> {
    self
      .insert_or_ignore(
        "INSERT OR IGNORE INTO centre_levels (centre_id, level_id)
         VALUES (?1, ?2)",
        vec![encode_uuid(centre_id), encode_uuid(level_id)],
      )
      .await
  }

  async fn link_subject(
    &self,
    centre_id:  Uuid,
    subject_id: Uuid,
  ) -> Result<bool> {
    self
      .insert_or_ignore(
        "INSERT OR IGNORE INTO centre_subjects (centre_id, subject_id)
         VALUES (?1, ?2)",
        vec![encode_uuid(centre_id), encode_uuid(subject_id)],
      )
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_centre(&self, centre_id: Uuid) -> Result<Option<CentreView>> {
    let id_str = encode_uuid(centre_id);

    let raw: Option<RawCentreView> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let centre = tx
          .query_row(
            &format!("SELECT {CENTRE_COLUMNS} FROM centres c WHERE c.centre_id = ?1"),
            rusqlite::params![id_str],
            RawCentre::from_row,
          )
          .optional()?;
        let view = centre.map(|c| load_view(&tx, c)).transpose()?;
        tx.commit()?;
        Ok(view)
      })
      .await?;

    raw.map(RawCentreView::into_view).transpose()
  }

  async fn search_centres(&self, query: &CentreQuery) -> Result<CentrePage> {
    let count = count_statement(query);
    let page = page_statement(query);

    let (total, raws): (i64, Vec<RawCentreView>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let total: i64 = tx.query_row(
          &count.sql,
          params_from_iter(count.params.iter()),
          |row| row.get(0),
        )?;
        let centres = tx
          .prepare(&page.sql)?
          .query_map(params_from_iter(page.params.iter()), RawCentre::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let views = centres
          .into_iter()
          .map(|c| load_view(&tx, c))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        tx.commit()?;
        Ok((total, views))
      })
      .await?;

    let centres = raws
      .into_iter()
      .map(RawCentreView::into_view)
      .collect::<Result<Vec<_>>>()?;
    Ok(CentrePage { centres, total: u64::try_from(total).unwrap_or(0) })
  }

  async fn centre_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM centres", [], |row| row.get(0))?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or(0))
  }

  async fn offering_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM offerings", [], |row| row.get(0))?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or(0))
  }

  async fn offered_levels(&self) -> Result<Vec<String>> {
    let mut names: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT l.name FROM offerings o
           JOIN levels l ON l.level_id = o.level_id",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    names.sort_by(|a, b| compare_levels(a, b));
    Ok(names)
  }

  async fn offered_subjects(&self) -> Result<Vec<String>> {
    let names: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT s.name FROM offerings o
           JOIN subjects s ON s.subject_id = o.subject_id
           ORDER BY s.name",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(names)
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn wipe(&self) -> Result<WipeSummary> {
    let counts: [usize; 6] = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let mut counts = [0usize; 6];
        for (slot, table) in counts.iter_mut().zip([
          "offerings",
          "centre_levels",
          "centre_subjects",
          "centres",
          "levels",
          "subjects",
        ]) {
          *slot = tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        Ok(counts)
      })
      .await?;

    let [offerings, centre_levels, centre_subjects, centres, levels, subjects] =
      counts.map(|n| n as u64);
    Ok(WipeSummary {
      offerings,
      centre_levels,
      centre_subjects,
      centres,
      levels,
      subjects,
    })
  }
}
