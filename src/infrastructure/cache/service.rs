//! Link cache trait and error types.

use async_trait::async_trait;

use crate::domain::entities::TrackedLink;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Pull-through cache of active tracked links, keyed by slug.
///
/// Only active links are ever stored. Entries expire after a TTL.
///
/// Fills race with deactivation: a request may read the link from the store
/// just before it is deactivated and write it back just after. So
/// [`LinkCache::invalidate`] leaves a tombstone for the slug, and
/// [`LinkCache::set_link`] only writes when the key is empty. A late fill
/// can then never resurrect a deactivated link.
///
/// Implementations must be thread-safe and fail open: cache trouble degrades
/// to a store lookup, never to a failed redirect.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait LinkCache: Send + Sync {
    /// Returns the cached link for `slug`.
    ///
    /// - `Ok(Some(link))` on cache hit
    /// - `Ok(None)` on cache miss
    async fn get_link(&self, slug: &str) -> CacheResult<Option<TrackedLink>>;

    /// Stores an active link with an optional TTL override in seconds.
    ///
    /// Does nothing if the key already holds an entry or a tombstone.
    async fn set_link(&self, link: &TrackedLink, ttl_seconds: Option<u64>) -> CacheResult<()>;

    /// Replaces the entry for `slug` with a tombstone that blocks fills for
    /// one TTL. Called when a link is deactivated.
    async fn invalidate(&self, slug: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
