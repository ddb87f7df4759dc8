//! Bearer-token middleware for the note routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

use super::AppState;

/// Reject requests without the configured bearer token.
///
/// An empty configured token disables the check entirely (development and
/// tests). Token issuance and verification beyond this shared-secret
/// comparison live outside this service.
pub async fn require_bearer(
  State(state): State<AppState>,
  request: Request,
  next: Next,
) -> Response {
  if state.api_token.is_empty() {
    return next.run(request).await;
  }

  let token = request
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim);

  match token {
    Some(token) if token == state.api_token => next.run(request).await,
    _ => ApiError::Unauthorized.into_response(),
  }
}
