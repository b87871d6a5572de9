//! JSON REST API for the tuition centre directory.
//!
//! Exposes an axum [`Router`] backed by a [`Directory`] over any
//! [`DirectoryStore`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tuition_api::api_router(directory.clone()))
//! ```

pub mod centres;
pub mod error;
pub mod filter_options;

use axum::{Router, routing::get};
use tuition_core::{directory::Directory, store::DirectoryStore};

pub use error::ApiError;

/// Build the API router for `directory`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(directory: Directory<S>) -> Router<()>
where
  S: DirectoryStore + 'static,
{
  Router::new()
    .route("/tuition-centres", get(centres::list::<S>))
    .route("/tuition-centres/{id}", get(centres::get_one::<S>))
    .route("/filter-options", get(filter_options::handler::<S>))
    .with_state(directory)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use serde_json::Value;
  use tower::ServiceExt as _;
  use tuition_core::{
    centre::NewCentre, quality::QualityStatus, store::DirectoryStore,
  };
  use tuition_store_sqlite::SqliteStore;
  use uuid::Uuid;

  use super::*;

  async fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
  }

  async fn add_centre(
    store: &SqliteStore,
    name: &str,
    offerings: &[(&str, &str)],
  ) -> Uuid {
    let centre = store
      .insert_centre(NewCentre {
        name:            name.into(),
        location:        "Marine Parade".into(),
        whatsapp_number: Some("91234567".into()),
        website:         None,
        quality_status:  QualityStatus::Ok,
        quality_notes:   None,
      })
      .await
      .unwrap();
    for (level, subject) in offerings {
      let level = store.upsert_level(level).await.unwrap();
      let subject = store.upsert_subject(subject).await.unwrap();
      store
        .add_offering(centre.centre_id, level.level_id, subject.subject_id)
        .await
        .unwrap();
      store.link_level(centre.centre_id, level.level_id).await.unwrap();
      store
        .link_subject(centre.centre_id, subject.subject_id)
        .await
        .unwrap();
    }
    centre.centre_id
  }

  async fn get_json(store: Arc<SqliteStore>, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = api_router(Directory::new(store)).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn names(body: &Value) -> Vec<&str> {
    body["data"]
      .as_array()
      .unwrap()
      .iter()
      .map(|c| c["name"].as_str().unwrap())
      .collect()
  }

  // ─── /tuition-centres ─────────────────────────────────────────────────

  #[tokio::test]
  async fn list_returns_camel_case_centres_with_pagination() {
    let s = store().await;
    add_centre(&s, "Alpha", &[("JC 1", "Physics")]).await;
    add_centre(&s, "Beta", &[]).await;

    let (status, body) = get_json(s, "/tuition-centres").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["Alpha", "Beta"]);
    let alpha = &body["data"][0];
    assert_eq!(alpha["whatsappNumber"], "91234567");
    assert_eq!(alpha["whatsappLink"], "https://wa.me/6591234567");
    assert_eq!(alpha["dataQualityStatus"], "OK");
    assert_eq!(alpha["levels"][0]["name"], "JC 1");
    assert_eq!(alpha["offerings"][0]["subject"], "Physics");
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalPages"], 1);
  }

  #[tokio::test]
  async fn combined_filter_matches_same_offering_row() {
    let s = store().await;
    add_centre(&s, "Split", &[("Secondary 1", "Physics"), ("JC 1", "Chemistry")])
      .await;
    add_centre(&s, "Whole", &[("JC 2", "Physics")]).await;

    let (_, body) = get_json(s.clone(), "/tuition-centres?levels=JC&subjects=Physics").await;
    assert_eq!(names(&body), ["Whole"]);

    let (_, body) =
      get_json(s, "/tuition-centres?level=JC%201&subject=Chemistry").await;
    assert_eq!(names(&body), ["Split"]);
  }

  #[tokio::test]
  async fn repeated_filter_keys_are_merged() {
    let s = store().await;
    add_centre(&s, "Junior", &[("JC 1", "Physics")]).await;
    add_centre(&s, "Primary", &[("Primary 4", "English")]).await;
    add_centre(&s, "Secondary", &[("Secondary 2", "Physics")]).await;

    let (status, body) =
      get_json(s.clone(), "/tuition-centres?levels=JC&levels=Primary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["Junior", "Primary"]);

    let (status, body) = get_json(
      s,
      "/tuition-centres?levels=JC,Secondary&subjects=English&subjects=Physics",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["Junior", "Secondary"]);
  }

  #[tokio::test]
  async fn filters_are_bypassed_without_offerings() {
    let s = store().await;
    add_centre(&s, "Alpha", &[]).await;
    add_centre(&s, "Beta", &[]).await;

    let (status, body) =
      get_json(s, "/tuition-centres?levels=Primary&subjects=Mathematics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["Alpha", "Beta"]);
  }

  #[tokio::test]
  async fn search_and_paging() {
    let s = store().await;
    for name in ["Alpha", "Beta", "Gamma"] {
      add_centre(&s, name, &[]).await;
    }
    let (_, body) = get_json(s.clone(), "/tuition-centres?search=amm").await;
    assert_eq!(names(&body), ["Gamma"]);

    let (_, body) = get_json(s, "/tuition-centres?page=2&limit=2").await;
    assert_eq!(names(&body), ["Gamma"]);
    assert_eq!(body["pagination"]["totalPages"], 2);
  }

  #[tokio::test]
  async fn invalid_paging_is_a_coded_bad_request() {
    let s = store().await;
    for (query, code) in [
      ("page=0", "INVALID_PAGE"),
      ("page=abc", "INVALID_PAGE"),
      ("limit=0", "INVALID_LIMIT"),
      ("limit=101", "LIMIT_EXCEEDED"),
    ] {
      let (status, body) =
        get_json(s.clone(), &format!("/tuition-centres?{query}")).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
      assert_eq!(body["error"]["code"], code, "{query}");
    }
  }

  // ─── /tuition-centres/{id} ────────────────────────────────────────────

  #[tokio::test]
  async fn get_one_by_id() {
    let s = store().await;
    let id = add_centre(&s, "Alpha", &[("Primary 1", "English")]).await;

    let (status, body) =
      get_json(s.clone(), &format!("/tuition-centres/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["subjects"][0]["name"], "English");

    let (status, body) =
      get_json(s.clone(), &format!("/tuition-centres/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = get_json(s, "/tuition-centres/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ID_FORMAT");
  }

  // ─── /filter-options ──────────────────────────────────────────────────

  #[tokio::test]
  async fn filter_options_reflect_offerings() {
    let s = store().await;
    add_centre(&s, "Alpha", &[]).await;

    let (_, body) = get_json(s.clone(), "/filter-options").await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["levels"], serde_json::json!([]));
    assert!(body["reason"].as_str().unwrap().contains("No offerings"));

    add_centre(&s, "Beta", &[("JC 1", "Physics"), ("Primary 2", "English")])
      .await;
    let (_, body) = get_json(s, "/filter-options").await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["levels"], serde_json::json!(["Primary 2", "JC 1"]));
    assert_eq!(body["subjects"], serde_json::json!(["English", "Physics"]));
    assert!(body.get("reason").is_none());
  }
}
