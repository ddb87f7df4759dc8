//! Note CRUD against the notes table.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::api::types::{DeleteRequest, NewNote, Note, UpdateNote};
use crate::error::ApiError;

use super::Store;

fn datetime_from_sql(raw: &str) -> Result<DateTime<Utc>, ApiError> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| ApiError::Internal(format!("Failed to parse datetime '{raw}': {e}")))
}

impl Store {
  /// List all notes, oldest first. Empty table is an error.
  pub fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT id, user, title, text, completed, created_at, updated_at
       FROM notes ORDER BY created_at",
    )?;
    let rows = stmt.query_map([], |row| {
      Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, bool>(4)?,
        row.get::<_, String>(5)?,
        row.get::<_, String>(6)?,
      ))
    })?;

    let mut notes = Vec::new();
    for row in rows {
      let (id, user, title, text, completed, created_at, updated_at) = row?;
      notes.push(Note {
        id,
        user,
        title,
        text,
        completed,
        created_at: datetime_from_sql(&created_at)?,
        updated_at: datetime_from_sql(&updated_at)?,
      });
    }

    if notes.is_empty() {
      return Err(ApiError::NotFound("No notes found".into()));
    }
    Ok(notes)
  }

  /// Create a note for an existing user. Returns the created title.
  pub fn create_note(&self, req: NewNote) -> Result<String, ApiError> {
    let user = req.user.unwrap_or_default();
    let title = req.title.unwrap_or_default();
    let text = req.text.unwrap_or_default();

    if user.is_empty() || title.is_empty() || text.is_empty() {
      return Err(ApiError::Validation("All fields are required".into()));
    }

    let conn = self.lock()?;

    // Every note must reference an existing user
    let owner: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM users WHERE id = ?1",
        params![user],
        |row| row.get(0),
      )
      .optional()?;
    if owner.is_none() {
      return Err(ApiError::NotFound("User not found".into()));
    }

    let duplicate: Option<String> = conn
      .query_row(
        "SELECT id FROM notes WHERE title = ?1",
        params![title],
        |row| row.get(0),
      )
      .optional()?;
    if duplicate.is_some() {
      return Err(ApiError::Duplicate("Duplicate note title".into()));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
      "INSERT INTO notes (id, user, title, text, completed, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
      params![id, user, title, text, now],
    )?;

    Ok(title)
  }

  /// Replace a note's fields and touch its updated_at. Returns the new
  /// title.
  pub fn update_note(&self, req: UpdateNote) -> Result<String, ApiError> {
    let id = req.id.unwrap_or_default();
    let user = req.user.unwrap_or_default();
    let title = req.title.unwrap_or_default();
    let text = req.text.unwrap_or_default();
    let completed = req
      .completed
      .ok_or_else(|| ApiError::Validation("All fields are required".into()))?;

    if id.is_empty() || user.is_empty() || title.is_empty() || text.is_empty() {
      return Err(ApiError::Validation("All fields are required".into()));
    }

    let conn = self.lock()?;

    let exists: Option<String> = conn
      .query_row("SELECT id FROM notes WHERE id = ?1", params![id], |row| {
        row.get(0)
      })
      .optional()?;
    if exists.is_none() {
      return Err(ApiError::NotFound("Note not found".into()));
    }

    let owner: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM users WHERE id = ?1",
        params![user],
        |row| row.get(0),
      )
      .optional()?;
    if owner.is_none() {
      return Err(ApiError::NotFound("User not found".into()));
    }

    // Self-collision is allowed
    let duplicate: Option<String> = conn
      .query_row(
        "SELECT id FROM notes WHERE title = ?1 AND id <> ?2",
        params![title, id],
        |row| row.get(0),
      )
      .optional()?;
    if duplicate.is_some() {
      return Err(ApiError::Duplicate("Duplicate note title".into()));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
      "UPDATE notes SET user = ?1, title = ?2, text = ?3, completed = ?4, updated_at = ?5
       WHERE id = ?6",
      params![user, title, text, completed, now, id],
    )?;

    Ok(title)
  }

  /// Delete a note by id.
  pub fn delete_note(&self, req: DeleteRequest) -> Result<String, ApiError> {
    let id = req.id.unwrap_or_default();
    if id.is_empty() {
      return Err(ApiError::Validation("Note ID required".into()));
    }

    let conn = self.lock()?;

    let title: Option<String> = conn
      .query_row(
        "SELECT title FROM notes WHERE id = ?1",
        params![id],
        |row| row.get(0),
      )
      .optional()?;
    let title = title.ok_or_else(|| ApiError::NotFound("Note not found".into()))?;

    conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;

    Ok(format!("Note '{title}' with ID {id} deleted"))
  }
}
