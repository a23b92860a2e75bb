//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheResult, LinkCache};
use crate::domain::entities::TrackedLink;
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when Redis is not configured, when it cannot be reached at startup,
/// and in tests. Every lookup is a miss.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for NullCache {
    async fn get_link(&self, _slug: &str) -> CacheResult<Option<TrackedLink>> {
        Ok(None)
    }

    async fn set_link(&self, _link: &TrackedLink, _ttl_seconds: Option<u64>) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _slug: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
