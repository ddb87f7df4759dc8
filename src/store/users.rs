//! User CRUD against the users table.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::api::types::{DeleteRequest, NewUser, UpdateUser, User};
use crate::error::ApiError;
use crate::password;

use super::Store;

fn roles_to_json(roles: &[String]) -> Result<String, ApiError> {
  serde_json::to_string(roles).map_err(|e| ApiError::Internal(e.to_string()))
}

fn roles_from_json(raw: &str) -> Result<Vec<String>, ApiError> {
  serde_json::from_str(raw).map_err(|e| ApiError::Internal(e.to_string()))
}

impl Store {
  /// List all users, password hashes stripped. Empty table is an error,
  /// not an empty array.
  pub fn list_users(&self) -> Result<Vec<User>, ApiError> {
    let conn = self.lock()?;
    let mut stmt =
      conn.prepare("SELECT id, username, roles, active FROM users ORDER BY username")?;
    let rows = stmt.query_map([], |row| {
      Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, bool>(3)?,
      ))
    })?;

    let mut users = Vec::new();
    for row in rows {
      let (id, username, roles, active) = row?;
      users.push(User {
        id,
        username,
        roles: roles_from_json(&roles)?,
        active,
      });
    }

    if users.is_empty() {
      return Err(ApiError::NotFound("No users found".into()));
    }
    Ok(users)
  }

  /// Create a user. Returns the created username.
  pub fn create_user(&self, req: NewUser) -> Result<String, ApiError> {
    let username = req.username.unwrap_or_default();
    let plaintext = req.password.unwrap_or_default();
    let roles = req.roles.unwrap_or_default();

    if username.is_empty() || plaintext.is_empty() || roles.is_empty() {
      return Err(ApiError::Validation("All fields are required".into()));
    }
    let roles_json = roles_to_json(&roles)?;

    let conn = self.lock()?;

    let duplicate: Option<String> = conn
      .query_row(
        "SELECT id FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
      )
      .optional()?;
    if duplicate.is_some() {
      return Err(ApiError::Duplicate("Duplicate username".into()));
    }

    let hashed = password::hash(&plaintext)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
      "INSERT INTO users (id, username, password, roles, active) VALUES (?1, ?2, ?3, ?4, 1)",
      params![id, username, hashed, roles_json],
    )?;

    Ok(username)
  }

  /// Replace a user's fields. Password is only rehashed when a new one is
  /// supplied; the stored hash is otherwise untouched. Returns the new
  /// username.
  pub fn update_user(&self, req: UpdateUser) -> Result<String, ApiError> {
    let id = req.id.unwrap_or_default();
    let username = req.username.unwrap_or_default();
    let roles = req.roles.unwrap_or_default();
    let active = req
      .active
      .ok_or_else(|| ApiError::Validation("All fields are required".into()))?;

    if id.is_empty() || username.is_empty() || roles.is_empty() {
      return Err(ApiError::Validation("All fields are required".into()));
    }
    let roles_json = roles_to_json(&roles)?;

    let conn = self.lock()?;

    let exists: Option<String> = conn
      .query_row("SELECT id FROM users WHERE id = ?1", params![id], |row| {
        row.get(0)
      })
      .optional()?;
    if exists.is_none() {
      return Err(ApiError::NotFound("User not found".into()));
    }

    // Self-collision is allowed: only another record's username conflicts
    let duplicate: Option<String> = conn
      .query_row(
        "SELECT id FROM users WHERE username = ?1 AND id <> ?2",
        params![username, id],
        |row| row.get(0),
      )
      .optional()?;
    if duplicate.is_some() {
      return Err(ApiError::Duplicate("Duplicate username".into()));
    }

    match req.password {
      Some(plaintext) if !plaintext.is_empty() => {
        let hashed = password::hash(&plaintext)?;
        conn.execute(
          "UPDATE users SET username = ?1, roles = ?2, active = ?3, password = ?4 WHERE id = ?5",
          params![username, roles_json, active, hashed, id],
        )?;
      }
      _ => {
        conn.execute(
          "UPDATE users SET username = ?1, roles = ?2, active = ?3 WHERE id = ?4",
          params![username, roles_json, active, id],
        )?;
      }
    }

    Ok(username)
  }

  /// Delete a user. The dependency check runs before the user is resolved
  /// or removed; a user with assigned notes is never deleted.
  pub fn delete_user(&self, req: DeleteRequest) -> Result<String, ApiError> {
    let id = req.id.unwrap_or_default();
    if id.is_empty() {
      return Err(ApiError::Validation("User ID required".into()));
    }

    let conn = self.lock()?;

    let has_note: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM notes WHERE user = ?1 LIMIT 1",
        params![id],
        |row| row.get(0),
      )
      .optional()?;
    if has_note.is_some() {
      return Err(ApiError::HasDependents("User has assigned notes".into()));
    }

    let username: Option<String> = conn
      .query_row(
        "SELECT username FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
      )
      .optional()?;
    let username = username.ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;

    Ok(format!("Username {username} with ID {id} deleted"))
  }

  #[cfg(test)]
  pub(crate) fn user_password_hash(&self, id: &str) -> Result<String, ApiError> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT password FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
      )
      .optional()?
      .ok_or_else(|| ApiError::NotFound("User not found".into()))
  }
}
