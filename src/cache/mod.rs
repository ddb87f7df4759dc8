//! Client-side cache with normalized entries and tag invalidation.
//!
//! - List responses are normalized into ordered ids plus an id-keyed map
//! - Each cached query declares the tags it provides (LIST + one per id)
//! - Mutations invalidate tags; dependent entries go stale and their
//!   subscribers are notified synchronously
//! - Subscriptions are use-counted guards; entries outlive them

mod normalize;
mod service;
mod tags;

pub use normalize::{Entity, Normalized};
pub use service::{CacheService, Subscription};
pub use tags::{Tag, TagId, TagKind};
