//! Injectable cache service with tag-driven invalidation.
//!
//! The service owns every cached query result for one client instance. It is
//! created with the client and dropped with it; nothing here is a process
//! global. Each entry remembers the tags it provides, and mutations
//! invalidate tags through an explicit tag-to-dependent-keys index.

use color_eyre::{eyre::eyre, Result};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::normalize::{Entity, Normalized};
use super::tags::Tag;

type SubscriberFn = Arc<dyn Fn() + Send + Sync>;

struct Subscriber {
  id: u64,
  callback: SubscriberFn,
}

/// One cached query result.
///
/// Data is held serialized so entries of different entity types can share
/// one map; callers deserialize on lookup.
struct Entry {
  data: serde_json::Value,
  provides: HashSet<Tag>,
  fetched_at: Instant,
  stale: bool,
}

#[derive(Default)]
struct Inner {
  entries: HashMap<&'static str, Entry>,
  /// Tag -> query keys whose entries provide that tag
  by_tag: HashMap<Tag, HashSet<&'static str>>,
  subscribers: HashMap<&'static str, Vec<Subscriber>>,
  next_subscriber_id: u64,
}

/// Cache service shared by all clones of a cached client.
#[derive(Clone)]
pub struct CacheService {
  inner: Arc<Mutex<Inner>>,
  /// Per-key fetch gates for in-flight de-duplication
  gates: Arc<Mutex<HashMap<&'static str, Arc<tokio::sync::Mutex<()>>>>>,
  /// How long before cached data is considered stale
  stale_after: Duration,
}

impl CacheService {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner::default())),
      gates: Arc::new(Mutex::new(HashMap::new())),
      stale_after: Duration::from_secs(300),
    }
  }

  /// Set the stale time for cached entries.
  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.stale_after = stale_after;
    self
  }

  fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
    self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Look up a cached result. Returns `None` when the key is absent, the
  /// entry has been invalidated, or the stale time has passed.
  pub fn lookup<T: Entity>(&self, key: &'static str) -> Result<Option<Normalized<T>>> {
    let inner = self.lock()?;
    let entry = match inner.entries.get(key) {
      Some(e) => e,
      None => return Ok(None),
    };
    if entry.stale || entry.fetched_at.elapsed() > self.stale_after {
      return Ok(None);
    }
    let data = serde_json::from_value(entry.data.clone())
      .map_err(|e| eyre!("Failed to deserialize cache entry {}: {}", key, e))?;
    Ok(Some(data))
  }

  /// Store a normalized result and index the tags it provides.
  pub fn store<T: Entity>(&self, key: &'static str, data: &Normalized<T>) -> Result<()> {
    let value = serde_json::to_value(data)
      .map_err(|e| eyre!("Failed to serialize cache entry {}: {}", key, e))?;
    let provides: HashSet<Tag> = data.provided_tags().into_iter().collect();

    let mut inner = self.lock()?;

    // Unlink tags the previous result provided but the new one doesn't
    let old_tags: Vec<Tag> = inner
      .entries
      .get(key)
      .map(|e| e.provides.iter().cloned().collect())
      .unwrap_or_default();
    for tag in old_tags {
      if let Some(keys) = inner.by_tag.get_mut(&tag) {
        keys.remove(key);
        if keys.is_empty() {
          inner.by_tag.remove(&tag);
        }
      }
    }

    for tag in &provides {
      inner.by_tag.entry(tag.clone()).or_default().insert(key);
    }

    inner.entries.insert(
      key,
      Entry {
        data: value,
        provides,
        fetched_at: Instant::now(),
        stale: false,
      },
    );
    Ok(())
  }

  /// Invalidate every entry providing any of the given tags.
  ///
  /// Affected entries are marked stale and their subscribers are invoked
  /// synchronously, once per affected key. Entries providing none of the
  /// tags keep their cached data untouched.
  pub fn invalidate(&self, tags: &[Tag]) -> Result<()> {
    let callbacks: Vec<SubscriberFn> = {
      let mut inner = self.lock()?;

      let mut affected: HashSet<&'static str> = HashSet::new();
      for tag in tags {
        if let Some(keys) = inner.by_tag.get(tag) {
          affected.extend(keys.iter().copied());
        }
      }

      let mut callbacks = Vec::new();
      for key in affected {
        if let Some(entry) = inner.entries.get_mut(key) {
          entry.stale = true;
        }
        if let Some(subs) = inner.subscribers.get(key) {
          callbacks.extend(subs.iter().map(|s| Arc::clone(&s.callback)));
        }
      }
      callbacks
    };

    // Run outside the lock so a refetch started inside a callback can
    // reach the cache without deadlocking.
    for callback in callbacks {
      callback();
    }
    Ok(())
  }

  /// Register a subscriber for a query key.
  ///
  /// The callback fires whenever a mutation invalidates a tag the key's
  /// entry provides. Dropping the returned guard releases the
  /// subscription; the cached entry itself persists for future
  /// subscribers.
  pub fn subscribe<F>(&self, key: &'static str, callback: F) -> Result<Subscription>
  where
    F: Fn() + Send + Sync + 'static,
  {
    let mut inner = self.lock()?;
    let id = inner.next_subscriber_id;
    inner.next_subscriber_id += 1;
    inner.subscribers.entry(key).or_default().push(Subscriber {
      id,
      callback: Arc::new(callback),
    });
    Ok(Subscription {
      inner: Arc::clone(&self.inner),
      key,
      id,
    })
  }

  /// Number of live subscriptions for a key.
  pub fn use_count(&self, key: &'static str) -> Result<usize> {
    Ok(self.lock()?.subscribers.get(key).map_or(0, |s| s.len()))
  }

  /// Whether an entry exists for the key, stale or not.
  pub fn contains(&self, key: &'static str) -> Result<bool> {
    Ok(self.lock()?.entries.contains_key(key))
  }

  /// Cache-checked fetch with in-flight de-duplication.
  ///
  /// A fresh, un-invalidated entry short-circuits the fetcher. Concurrent
  /// callers for the same key coalesce: the first fetches, the rest wait
  /// on the gate and are then served from cache.
  pub async fn get_or_fetch<T, F, Fut>(&self, key: &'static str, fetcher: F) -> Result<Normalized<T>>
  where
    T: Entity,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    if let Some(hit) = self.lookup(key)? {
      return Ok(hit);
    }

    let gate = self.gate(key)?;
    let _guard = gate.lock().await;

    // Another caller may have fetched while we waited on the gate
    if let Some(hit) = self.lookup(key)? {
      return Ok(hit);
    }

    let list = fetcher().await?;
    let data = Normalized::from_list(list);
    self.store(key, &data)?;
    Ok(data)
  }

  fn gate(&self, key: &'static str) -> Result<Arc<tokio::sync::Mutex<()>>> {
    let mut gates = self
      .gates
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(Arc::clone(gates.entry(key).or_default()))
  }
}

impl Default for CacheService {
  fn default() -> Self {
    Self::new()
  }
}

/// Live subscription to a cached query.
///
/// Dropping it unregisters the callback and decrements the use-count.
/// In-flight fetches are not aborted; their results still land in cache.
pub struct Subscription {
  inner: Arc<Mutex<Inner>>,
  key: &'static str,
  id: u64,
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Ok(mut inner) = self.inner.lock() {
      if let Some(subs) = inner.subscribers.get_mut(self.key) {
        subs.retain(|s| s.id != self.id);
      }
    }
  }
}
