//! User route handlers.
//!
//! Each handler is validate -> conditional write -> acknowledge; the store
//! owns the checks, the handler owns the wire shape.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::{DeleteRequest, MessageResponse, NewUser, UpdateUser, User};
use crate::error::ApiError;

use super::AppState;

/// GET /users
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
  Ok(Json(state.store.list_users()?))
}

/// POST /users
pub async fn create(
  State(state): State<AppState>,
  Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
  let username = state.store.create_user(req)?;
  Ok((
    StatusCode::CREATED,
    Json(MessageResponse {
      message: format!("New user {username} created"),
    }),
  ))
}

/// PATCH /users
pub async fn update(
  State(state): State<AppState>,
  Json(req): Json<UpdateUser>,
) -> Result<Json<MessageResponse>, ApiError> {
  let username = state.store.update_user(req)?;
  Ok(Json(MessageResponse {
    message: format!("{username} updated"),
  }))
}

/// DELETE /users - responds with a bare confirmation string
pub async fn remove(
  State(state): State<AppState>,
  Json(req): Json<DeleteRequest>,
) -> Result<Json<String>, ApiError> {
  Ok(Json(state.store.delete_user(req)?))
}
