//! Note route handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::{DeleteRequest, MessageResponse, NewNote, Note, UpdateNote};
use crate::error::ApiError;

use super::AppState;

/// GET /notes
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
  Ok(Json(state.store.list_notes()?))
}

/// POST /notes
pub async fn create(
  State(state): State<AppState>,
  Json(req): Json<NewNote>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
  state.store.create_note(req)?;
  Ok((
    StatusCode::CREATED,
    Json(MessageResponse {
      message: "New note created".to_string(),
    }),
  ))
}

/// PATCH /notes
pub async fn update(
  State(state): State<AppState>,
  Json(req): Json<UpdateNote>,
) -> Result<Json<MessageResponse>, ApiError> {
  let title = state.store.update_note(req)?;
  Ok(Json(MessageResponse {
    message: format!("'{title}' updated"),
  }))
}

/// DELETE /notes - responds with a bare confirmation string
pub async fn remove(
  State(state): State<AppState>,
  Json(req): Json<DeleteRequest>,
) -> Result<Json<String>, ApiError> {
  Ok(Json(state.store.delete_note(req)?))
}
