//! Handlers for `/tuition-centres` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tuition-centres` | `levels`, `subjects`, `search`, `page`, `limit` |
//! | `GET`  | `/tuition-centres/{id}` | 400 on a malformed id, 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tuition_core::{
  centre::CentreView,
  directory::{Directory, SearchRequest},
  filter::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT},
  phone::whatsapp_link,
  quality::QualityStatus,
  store::DirectoryStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Response bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NamedRef {
  pub id:   Uuid,
  pub name: String,
}

#[derive(Debug, Serialize)]
pub struct OfferingBody {
  pub level:   String,
  pub subject: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CentreBody {
  pub id:                  Uuid,
  pub name:                String,
  pub location:            String,
  pub whatsapp_number:     Option<String>,
  pub whatsapp_link:       Option<String>,
  pub website:             Option<String>,
  pub data_quality_status: QualityStatus,
  pub levels:              Vec<NamedRef>,
  pub subjects:            Vec<NamedRef>,
  pub offerings:           Vec<OfferingBody>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl From<CentreView> for CentreBody {
  fn from(view: CentreView) -> Self {
    let centre = view.centre;
    Self {
      id:                  centre.centre_id,
      whatsapp_link:       centre.whatsapp_number.as_deref().and_then(whatsapp_link),
      name:                centre.name,
      location:            centre.location,
      whatsapp_number:     centre.whatsapp_number,
      website:             centre.website,
      data_quality_status: centre.quality_status,
      levels:              view
        .levels
        .into_iter()
        .map(|l| NamedRef { id: l.level_id, name: l.name })
        .collect(),
      subjects:            view
        .subjects
        .into_iter()
        .map(|s| NamedRef { id: s.subject_id, name: s.name })
        .collect(),
      offerings:           view
        .offerings
        .into_iter()
        .map(|o| OfferingBody { level: o.level, subject: o.subject })
        .collect(),
      created_at:          centre.created_at,
      updated_at:          centre.updated_at,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub page:        u32,
  pub limit:       u32,
  pub total:       u64,
  pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ListBody {
  pub data:       Vec<CentreBody>,
  pub pagination: Pagination,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// Raw query parameters. Numbers arrive as text so that malformed values get
/// a coded 400 instead of an extractor rejection. List keys may repeat and
/// each value may itself be comma-separated.
#[derive(Debug, Default)]
pub struct ListParams {
  /// Values of `levels` and `level`, in query order.
  pub levels:   Vec<String>,
  /// Values of `subjects` and `subject`, in query order.
  pub subjects: Vec<String>,
  pub search:   Option<String>,
  pub page:     Option<String>,
  pub limit:    Option<String>,
}

impl FromIterator<(String, String)> for ListParams {
  /// Scalar keys keep their last value. Unknown keys are ignored.
  fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
    let mut params = Self::default();
    for (key, value) in pairs {
      match key.as_str() {
        "levels" | "level" => params.levels.push(value),
        "subjects" | "subject" => params.subjects.push(value),
        "search" => params.search = Some(value),
        "page" => params.page = Some(value),
        "limit" => params.limit = Some(value),
        _ => {}
      }
    }
    params
  }
}

/// Split every comma-separated value of a list parameter into names.
fn split_list(values: &[String]) -> Vec<String> {
  values
    .iter()
    .flat_map(|s| s.split(','))
    .map(|t| t.trim().to_owned())
    .filter(|t| !t.is_empty())
    .collect()
}

fn parse_page(raw: Option<&str>) -> Result<u32, ApiError> {
  let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
    return Ok(DEFAULT_PAGE);
  };
  match raw.parse::<u32>() {
    Ok(page) if page >= 1 => Ok(page),
    _ => Err(ApiError::bad_request(
      "INVALID_PAGE",
      "Page must be a positive integer",
    )),
  }
}

fn parse_limit(raw: Option<&str>) -> Result<u32, ApiError> {
  let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
    return Ok(DEFAULT_LIMIT);
  };
  match raw.parse::<u64>() {
    Ok(limit) if limit > u64::from(MAX_LIMIT) => Err(ApiError::bad_request(
      "LIMIT_EXCEEDED",
      format!("Limit cannot exceed {MAX_LIMIT}"),
    )),
    Ok(limit) if limit >= 1 => Ok(limit as u32),
    _ => Err(ApiError::bad_request(
      "INVALID_LIMIT",
      "Limit must be a positive integer",
    )),
  }
}

impl ListParams {
  pub fn into_request(self) -> Result<SearchRequest, ApiError> {
    Ok(SearchRequest {
      page:     parse_page(self.page.as_deref())?,
      limit:    parse_limit(self.limit.as_deref())?,
      levels:   split_list(&self.levels),
      subjects: split_list(&self.subjects),
      search:   self.search.filter(|s| !s.trim().is_empty()),
    })
  }
}

/// `GET /tuition-centres[?levels=..][&subjects=..][&search=..][&page=..][&limit=..]`
pub async fn list<S>(
  State(directory): State<Directory<S>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ListBody>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let request = pairs.into_iter().collect::<ListParams>().into_request()?;
  let results = directory.search(request).await.map_err(ApiError::store)?;

  Ok(Json(ListBody {
    data:       results.centres.into_iter().map(CentreBody::from).collect(),
    pagination: Pagination {
      page:        results.page,
      limit:       results.limit,
      total:       results.total,
      total_pages: results.total_pages,
    },
  }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /tuition-centres/{id}`
pub async fn get_one<S>(
  State(directory): State<Directory<S>>,
  Path(id): Path<String>,
) -> Result<Json<CentreBody>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let id = Uuid::parse_str(id.trim()).map_err(|_| {
    ApiError::bad_request("INVALID_ID_FORMAT", "Centre id must be a UUID")
  })?;
  let view = directory
    .centre(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("tuition centre {id}")))?;
  Ok(Json(view.into()))
}
