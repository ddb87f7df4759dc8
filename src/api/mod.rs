//! HTTP API surface: wire types plus the plain and caching clients.

pub mod cached_client;
pub mod client;
pub mod types;

pub use cached_client::{CachedClient, PrefetchHandle, NOTES_QUERY, USERS_QUERY};
pub use client::Client;
