//! Caching wrapper around the API client.
//!
//! List queries go through the cache; mutations run against the server and
//! then invalidate the tags they touched. Creating an entity invalidates the
//! list tag only, while updates and deletes invalidate the specific id tag,
//! which reaches every cached query that provided that entity.

use color_eyre::Result;

use super::client::Client;
use super::types::{NewNote, NewUser, Note, UpdateNote, UpdateUser, User};
use crate::cache::{CacheService, Normalized, Subscription, Tag, TagKind};

/// Query key for the users list.
pub const USERS_QUERY: &str = "users:list";
/// Query key for the notes list.
pub const NOTES_QUERY: &str = "notes:list";

#[derive(Clone)]
pub struct CachedClient {
  client: Client,
  cache: CacheService,
}

impl CachedClient {
  pub fn new(client: Client) -> Self {
    Self::with_cache(client, CacheService::new())
  }

  pub fn with_cache(client: Client, cache: CacheService) -> Self {
    Self { client, cache }
  }

  pub fn cache(&self) -> &CacheService {
    &self.cache
  }

  pub async fn get_users(&self) -> Result<Normalized<User>> {
    let client = self.client.clone();
    self
      .cache
      .get_or_fetch(USERS_QUERY, move || async move { client.get_users().await })
      .await
  }

  pub async fn create_user(&self, req: NewUser) -> Result<String> {
    let message = self.client.create_user(req).await?;
    self.cache.invalidate(&[Tag::list(TagKind::User)])?;
    Ok(message)
  }

  pub async fn update_user(&self, req: UpdateUser) -> Result<String> {
    let id = req.id.clone();
    let message = self.client.update_user(req).await?;
    if let Some(id) = id {
      self.cache.invalidate(&[Tag::id(TagKind::User, id)])?;
    }
    Ok(message)
  }

  pub async fn delete_user(&self, id: &str) -> Result<String> {
    let reply = self.client.delete_user(id).await?;
    self.cache.invalidate(&[Tag::id(TagKind::User, id)])?;
    Ok(reply)
  }

  /// Fetch the notes list, open notes ahead of completed ones.
  pub async fn get_notes(&self) -> Result<Normalized<Note>> {
    let client = self.client.clone();
    self
      .cache
      .get_or_fetch(NOTES_QUERY, move || async move {
        let mut notes = client.get_notes().await?;
        // Stable sort, so notes with equal state keep their server order
        notes.sort_by_key(|n| n.completed);
        Ok(notes)
      })
      .await
  }

  pub async fn create_note(&self, req: NewNote) -> Result<String> {
    let message = self.client.create_note(req).await?;
    self.cache.invalidate(&[Tag::list(TagKind::Note)])?;
    Ok(message)
  }

  pub async fn update_note(&self, req: UpdateNote) -> Result<String> {
    let id = req.id.clone();
    let message = self.client.update_note(req).await?;
    if let Some(id) = id {
      self.cache.invalidate(&[Tag::id(TagKind::Note, id)])?;
    }
    Ok(message)
  }

  pub async fn delete_note(&self, id: &str) -> Result<String> {
    let reply = self.client.delete_note(id).await?;
    self.cache.invalidate(&[Tag::id(TagKind::Note, id)])?;
    Ok(reply)
  }

  /// Warm both list queries and keep them subscribed so the entries stay
  /// alive across invalidations. Fetch errors are tolerated here; an empty
  /// collection is an error end to end but not a reason to fail startup.
  pub async fn prefetch(&self) -> Result<PrefetchHandle> {
    let _ = self.get_users().await;
    let _ = self.get_notes().await;
    Ok(PrefetchHandle {
      _users: self.cache.subscribe(USERS_QUERY, || {})?,
      _notes: self.cache.subscribe(NOTES_QUERY, || {})?,
    })
  }
}

/// Keeps the startup subscriptions registered until dropped.
pub struct PrefetchHandle {
  _users: Subscription,
  _notes: Subscription,
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use super::*;
  use crate::server::{router, AppState};
  use crate::store::Store;

  async fn spawn_server(api_token: &str) -> String {
    let store = Store::open_in_memory().unwrap();
    let state = AppState {
      store: Arc::new(store),
      api_token: api_token.to_string(),
    };
    let app = router(state, &[]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
  }

  fn cached_client(base: &str, token: Option<&str>) -> CachedClient {
    CachedClient::new(Client::new(base, token.map(String::from)).unwrap())
  }

  #[tokio::test]
  async fn list_is_served_from_cache_until_invalidated() {
    let base = spawn_server("").await;
    let cached = cached_client(&base, None);

    cached
      .create_user(NewUser::new("alice", "pw123456", vec!["Employee".into()]))
      .await
      .unwrap();
    assert_eq!(cached.get_users().await.unwrap().len(), 1);

    // Write through a raw client; the cache does not see this mutation
    let raw = Client::new(&base, None).unwrap();
    raw
      .create_user(NewUser::new("bob", "pw123456", vec!["Employee".into()]))
      .await
      .unwrap();
    assert_eq!(cached.get_users().await.unwrap().len(), 1);

    // A cached mutation invalidates the list tag and forces a refetch
    cached
      .create_user(NewUser::new("carol", "pw123456", vec!["Manager".into()]))
      .await
      .unwrap();
    assert_eq!(cached.get_users().await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn empty_collections_surface_the_server_message() {
    let base = spawn_server("").await;
    let cached = cached_client(&base, None);

    let err = cached.get_users().await.unwrap_err();
    assert!(err.to_string().contains("No users found"));
    let err = cached.get_notes().await.unwrap_err();
    assert!(err.to_string().contains("No notes found"));
  }

  #[tokio::test]
  async fn update_invalidates_only_the_touched_entity() {
    let base = spawn_server("").await;
    let cached = cached_client(&base, None);

    cached
      .create_user(NewUser::new("alice", "pw123456", vec!["Employee".into()]))
      .await
      .unwrap();
    let users = cached.get_users().await.unwrap();
    let alice = users.all().into_iter().next().unwrap();

    cached
      .create_note(NewNote::new(&alice.id, "First", "body"))
      .await
      .unwrap();
    cached.get_notes().await.unwrap();

    let user_hits = Arc::new(AtomicUsize::new(0));
    let note_hits = Arc::new(AtomicUsize::new(0));
    let u = Arc::clone(&user_hits);
    let n = Arc::clone(&note_hits);
    let _s1 = cached
      .cache()
      .subscribe(USERS_QUERY, move || {
        u.fetch_add(1, Ordering::SeqCst);
      })
      .unwrap();
    let _s2 = cached
      .cache()
      .subscribe(NOTES_QUERY, move || {
        n.fetch_add(1, Ordering::SeqCst);
      })
      .unwrap();

    let req = UpdateUser::new(&alice.id, "alice", vec!["Manager".into()], true);
    cached.update_user(req).await.unwrap();

    assert_eq!(user_hits.load(Ordering::SeqCst), 1);
    assert_eq!(note_hits.load(Ordering::SeqCst), 0);

    let users = cached.get_users().await.unwrap();
    assert_eq!(
      users.get(&alice.id).unwrap().roles,
      vec!["Manager".to_string()]
    );
  }

  #[tokio::test]
  async fn notes_come_back_open_first() {
    let base = spawn_server("").await;
    let cached = cached_client(&base, None);

    cached
      .create_user(NewUser::new("alice", "pw123456", vec!["Employee".into()]))
      .await
      .unwrap();
    let users = cached.get_users().await.unwrap();
    let alice = users.all().into_iter().next().unwrap();

    cached
      .create_note(NewNote::new(&alice.id, "Older", "body"))
      .await
      .unwrap();
    cached
      .create_note(NewNote::new(&alice.id, "Newer", "body"))
      .await
      .unwrap();

    let notes = cached.get_notes().await.unwrap();
    let older = notes.all().into_iter().find(|n| n.title == "Older").unwrap();

    let req = UpdateNote::new(&older.id, &alice.id, "Older", "body", true);
    cached.update_note(req).await.unwrap();

    let notes = cached.get_notes().await.unwrap();
    let titles: Vec<&str> = notes.all().iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
    assert!(notes.all()[1].completed);
  }

  #[tokio::test]
  async fn note_routes_require_the_configured_token() {
    let base = spawn_server("secret").await;

    let anon = cached_client(&base, None);
    anon
      .create_user(NewUser::new("alice", "pw123456", vec!["Employee".into()]))
      .await
      .unwrap();
    let users = anon.get_users().await.unwrap();
    let alice = users.all().into_iter().next().unwrap();

    let err = anon
      .create_note(NewNote::new(&alice.id, "First", "body"))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("Unauthorized"));

    let authed = cached_client(&base, Some("secret"));
    authed
      .create_note(NewNote::new(&alice.id, "First", "body"))
      .await
      .unwrap();
    assert_eq!(authed.get_notes().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn delete_returns_the_confirmation_string() {
    let base = spawn_server("").await;
    let cached = cached_client(&base, None);

    cached
      .create_user(NewUser::new("alice", "pw123456", vec!["Employee".into()]))
      .await
      .unwrap();
    let users = cached.get_users().await.unwrap();
    let alice = users.all().into_iter().next().unwrap();

    let reply = cached.delete_user(&alice.id).await.unwrap();
    assert_eq!(reply, format!("Username alice with ID {} deleted", alice.id));
  }

  #[tokio::test]
  async fn prefetch_holds_subscriptions_on_both_queries() {
    let base = spawn_server("").await;
    let cached = cached_client(&base, None);

    let handle = cached.prefetch().await.unwrap();
    assert_eq!(cached.cache().use_count(USERS_QUERY).unwrap(), 1);
    assert_eq!(cached.cache().use_count(NOTES_QUERY).unwrap(), 1);

    drop(handle);
    assert_eq!(cached.cache().use_count(USERS_QUERY).unwrap(), 0);
    assert_eq!(cached.cache().use_count(NOTES_QUERY).unwrap(), 0);
  }
}
