//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": {"code": ..., "message": ...}}`. Store
//! failures are logged with their detail and reported generically.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// A rejected request parameter, with a machine-readable code such as
  /// `INVALID_PAGE`.
  #[error("{code}: {message}")]
  BadRequest { code: &'static str, message: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
    ApiError::BadRequest { code, message: message.into() }
  }

  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }

  pub fn code(&self) -> &'static str {
    match self {
      ApiError::NotFound(_) => "NOT_FOUND",
      ApiError::BadRequest { code, .. } => code,
      ApiError::Store(_) => "DATABASE_ERROR",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest { message, .. } => {
        (StatusCode::BAD_REQUEST, message.clone())
      }
      ApiError::Store(e) => {
        error!(error = %e, "store failure while serving request");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "Failed to read from the directory database".to_owned(),
        )
      }
    };
    let body = json!({ "error": { "code": self.code(), "message": message } });
    (status, Json(body)).into_response()
  }
}
