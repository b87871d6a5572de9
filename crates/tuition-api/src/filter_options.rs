//! Handler for `GET /filter-options`.

use axum::{Json, extract::State};
use tuition_core::{
  directory::{Directory, FilterOptions},
  store::DirectoryStore,
};

use crate::error::ApiError;

/// `GET /filter-options`: `{enabled, levels, subjects, reason?}`
pub async fn handler<S>(
  State(directory): State<Directory<S>>,
) -> Result<Json<FilterOptions>, ApiError>
where
  S: DirectoryStore + 'static,
{
  let options = directory.filter_options().await.map_err(ApiError::store)?;
  Ok(Json(options))
}
