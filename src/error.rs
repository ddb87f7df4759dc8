//! API error taxonomy shared by the store and the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by entity operations.
///
/// Unresolved ids and empty collections map to 400, not 404 - clients
/// depend on the original wire contract.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or malformed required fields
  #[error("{0}")]
  Validation(String),

  /// An id did not resolve, or a collection is empty
  #[error("{0}")]
  NotFound(String),

  /// A uniqueness constraint (username, note title) was violated
  #[error("{0}")]
  Duplicate(String),

  /// The record is still referenced by dependent records
  #[error("{0}")]
  HasDependents(String),

  /// Missing or invalid bearer token
  #[error("Unauthorized")]
  Unauthorized,

  /// Storage or hashing failure
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::BAD_REQUEST,
      ApiError::Duplicate(_) => StatusCode::CONFLICT,
      ApiError::HasDependents(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let ApiError::Internal(message) = &self {
      tracing::error!("internal error: {message}");
    }
    let body = json!({ "message": self.to_string() });
    (self.status(), Json(body)).into_response()
  }
}

impl From<rusqlite::Error> for ApiError {
  fn from(e: rusqlite::Error) -> Self {
    ApiError::Internal(e.to_string())
  }
}
