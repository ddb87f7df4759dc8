//! Cache tags addressing entity collections and individual records.

use std::fmt;

/// Entity type a tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
  User,
  Note,
}

impl fmt::Display for TagKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TagKind::User => write!(f, "User"),
      TagKind::Note => write!(f, "Note"),
    }
  }
}

/// Either the collection-wide LIST tag or a single record's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagId {
  List,
  Id(String),
}

/// Label identifying a cached resource or resource collection.
///
/// Queries declare the tags they provide; mutations invalidate tags, which
/// marks every dependent query stale and triggers subscriber refetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
  pub kind: TagKind,
  pub id: TagId,
}

impl Tag {
  /// The collection-wide tag for an entity type.
  pub fn list(kind: TagKind) -> Self {
    Self {
      kind,
      id: TagId::List,
    }
  }

  /// The tag for one record.
  pub fn id(kind: TagKind, id: impl Into<String>) -> Self {
    Self {
      kind,
      id: TagId::Id(id.into()),
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.id {
      TagId::List => write!(f, "{}:LIST", self.kind),
      TagId::Id(id) => write!(f, "{}:{}", self.kind, id),
    }
  }
}
