//! Wire types shared by the server handlers and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{Entity, TagKind};

/// A user as returned to clients. There is no password field here at all;
/// the stored hash never crosses the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub username: String,
  pub roles: Vec<String>,
  pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
  pub id: String,
  /// Id of the owning user
  pub user: String,
  pub title: String,
  pub text: String,
  pub completed: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Create-user request. Fields are optional on the wire so a missing field
/// reaches the validation path and gets a 400, not a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub password: Option<String>,
  #[serde(default)]
  pub roles: Option<Vec<String>>,
}

impl NewUser {
  pub fn new(
    username: impl Into<String>,
    password: impl Into<String>,
    roles: Vec<String>,
  ) -> Self {
    Self {
      username: Some(username.into()),
      password: Some(password.into()),
      roles: Some(roles),
    }
  }
}

/// Update-user request: id plus the complete replacement field set.
/// Password is the one optional field; absent means keep the stored hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub roles: Option<Vec<String>>,
  #[serde(default)]
  pub active: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
}

impl UpdateUser {
  pub fn new(
    id: impl Into<String>,
    username: impl Into<String>,
    roles: Vec<String>,
    active: bool,
  ) -> Self {
    Self {
      id: Some(id.into()),
      username: Some(username.into()),
      roles: Some(roles),
      active: Some(active),
      password: None,
    }
  }

  pub fn with_password(mut self, password: impl Into<String>) -> Self {
    self.password = Some(password.into());
    self
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
  #[serde(default)]
  pub user: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub text: Option<String>,
}

impl NewNote {
  pub fn new(user: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      user: Some(user.into()),
      title: Some(title.into()),
      text: Some(text.into()),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNote {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub user: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub completed: Option<bool>,
}

impl UpdateNote {
  pub fn new(
    id: impl Into<String>,
    user: impl Into<String>,
    title: impl Into<String>,
    text: impl Into<String>,
    completed: bool,
  ) -> Self {
    Self {
      id: Some(id.into()),
      user: Some(user.into()),
      title: Some(title.into()),
      text: Some(text.into()),
      completed: Some(completed),
    }
  }
}

/// Delete request body for both entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
  #[serde(default)]
  pub id: Option<String>,
}

impl DeleteRequest {
  pub fn new(id: impl Into<String>) -> Self {
    Self { id: Some(id.into()) }
  }
}

/// Mutation acknowledgment body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
  pub message: String,
}

impl Entity for User {
  fn id(&self) -> &str {
    &self.id
  }

  fn tag_kind() -> TagKind {
    TagKind::User
  }
}

impl Entity for Note {
  fn id(&self) -> &str {
    &self.id
  }

  fn tag_kind() -> TagKind {
    TagKind::Note
  }
}
