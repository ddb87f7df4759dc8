//! Normalization of list responses into an ordered-id + id-keyed form.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::tags::{Tag, TagKind};

/// Trait for entities the cache can normalize and tag.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// External identifier, used as the entity-map key
  fn id(&self) -> &str;

  /// Entity type for tag addressing
  fn tag_kind() -> TagKind;
}

/// Normalized query result.
///
/// A raw array response becomes an ordered id sequence plus an id-to-entity
/// map, keyed by each entity's identifier. An empty response is a distinct
/// variant rather than a populated result with zero ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Normalized<T> {
  Empty,
  Populated {
    ids: Vec<String>,
    entities: HashMap<String, T>,
  },
}

impl<T: Entity> Normalized<T> {
  /// Normalize a list response, preserving its order.
  pub fn from_list(list: Vec<T>) -> Self {
    if list.is_empty() {
      return Normalized::Empty;
    }

    let mut ids = Vec::with_capacity(list.len());
    let mut entities = HashMap::with_capacity(list.len());
    for entity in list {
      let id = entity.id().to_string();
      ids.push(id.clone());
      entities.insert(id, entity);
    }

    Normalized::Populated { ids, entities }
  }

  /// Ordered ids; empty slice for `Empty`.
  pub fn ids(&self) -> &[String] {
    match self {
      Normalized::Empty => &[],
      Normalized::Populated { ids, .. } => ids,
    }
  }

  /// Look up one entity by id.
  pub fn get(&self, id: &str) -> Option<&T> {
    match self {
      Normalized::Empty => None,
      Normalized::Populated { entities, .. } => entities.get(id),
    }
  }

  /// All entities in their original order.
  pub fn all(&self) -> Vec<&T> {
    match self {
      Normalized::Empty => Vec::new(),
      Normalized::Populated { ids, entities } => {
        ids.iter().filter_map(|id| entities.get(id)).collect()
      }
    }
  }

  pub fn len(&self) -> usize {
    self.ids().len()
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Normalized::Empty)
  }

  /// Tags this result provides: the LIST tag plus one tag per id.
  ///
  /// An empty result still provides the LIST tag so that a later create
  /// invalidates the cached emptiness.
  pub fn provided_tags(&self) -> Vec<Tag> {
    let kind = T::tag_kind();
    let mut tags = vec![Tag::list(kind)];
    tags.extend(self.ids().iter().map(|id| Tag::id(kind, id.clone())));
    tags
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::tags::TagId;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item {
    id: String,
    label: String,
  }

  impl Entity for Item {
    fn id(&self) -> &str {
      &self.id
    }

    fn tag_kind() -> TagKind {
      TagKind::Note
    }
  }

  fn item(id: &str, label: &str) -> Item {
    Item {
      id: id.into(),
      label: label.into(),
    }
  }

  #[test]
  fn empty_list_normalizes_to_empty() {
    let n = Normalized::<Item>::from_list(Vec::new());
    assert!(n.is_empty());
    assert_eq!(n.ids(), &[] as &[String]);
    assert_eq!(n.provided_tags(), vec![Tag::list(TagKind::Note)]);
  }

  #[test]
  fn preserves_order_and_keys_by_id() {
    let n = Normalized::from_list(vec![item("b", "two"), item("a", "one")]);
    assert_eq!(n.ids(), ["b".to_string(), "a".to_string()]);
    assert_eq!(n.get("a").unwrap().label, "one");
    assert_eq!(n.len(), 2);

    let ordered: Vec<&str> = n.all().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ordered, ["b", "a"]);
  }

  #[test]
  fn provides_list_tag_plus_one_per_id() {
    let n = Normalized::from_list(vec![item("a", "one"), item("b", "two")]);
    let tags = n.provided_tags();
    assert_eq!(tags.len(), 3);
    assert_eq!(tags[0], Tag::list(TagKind::Note));
    assert!(tags.contains(&Tag::id(TagKind::Note, "a")));
    assert!(tags.contains(&Tag::id(TagKind::Note, "b")));
    assert!(!tags.iter().any(|t| t.id == TagId::Id("c".into())));
  }

  #[test]
  fn survives_serialization() {
    let n = Normalized::from_list(vec![item("a", "one")]);
    let value = serde_json::to_value(&n).unwrap();
    let back: Normalized<Item> = serde_json::from_value(value).unwrap();
    assert_eq!(back, n);
  }
}
