//! Redis-backed link cache.

use super::service::{CacheError, CacheResult, LinkCache};
use crate::domain::entities::TrackedLink;
use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, ExistenceCheck, SetExpiry, SetOptions, aio::ConnectionManager,
};
use tracing::{debug, error, info, warn};

/// Value stored under a slug after deactivation. Never valid JSON for a link.
const TOMBSTONE: &str = "deactivated";

/// What a cache key currently holds.
#[derive(Debug)]
enum Entry {
    Link(TrackedLink),
    Tombstone,
    Undecodable(serde_json::Error),
}

fn decode_entry(raw: &str) -> Entry {
    if raw == TOMBSTONE {
        return Entry::Tombstone;
    }
    match serde_json::from_str::<TrackedLink>(raw) {
        Ok(link) => Entry::Link(link),
        Err(e) => Entry::Undecodable(e),
    }
}

/// Redis cache of active tracked links, stored as JSON.
///
/// Uses `ConnectionManager` for connection reuse and reconnects. Fills use
/// `SET NX`, and deactivation writes a tombstone, so a fill that lands after
/// an invalidation is discarded by Redis.
///
/// Reads and fills are fail-open: errors are logged but don't propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `default_ttl_seconds` - TTL applied when [`LinkCache::set_link`] is called
    ///   without an override; controlled via `CACHE_TTL_SECONDS`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
            key_prefix: "link:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, slug: &str) -> String {
        format!("{}{}", self.key_prefix, slug)
    }
}

#[async_trait]
impl LinkCache for RedisCache {
    async fn get_link(&self, slug: &str) -> CacheResult<Option<TrackedLink>> {
        let key = self.build_key(slug);
        let mut conn = self.client.clone();

        let raw = match conn.get::<_, Option<String>>(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Redis GET error for {}: {}", slug, e);
                return Ok(None);
            }
        };

        let Some(raw) = raw else {
            debug!("Cache MISS: {}", slug);
            return Ok(None);
        };

        match decode_entry(&raw) {
            Entry::Link(link) if link.is_active => {
                debug!("Cache HIT: {}", slug);
                Ok(Some(link))
            }
            Entry::Link(_) => Ok(None),
            Entry::Tombstone => {
                debug!("Cache TOMBSTONE: {}", slug);
                Ok(None)
            }
            Entry::Undecodable(e) => {
                // Entry written by an older layout; drop it and reload from the store.
                warn!("Discarding undecodable cache entry for {}: {}", slug, e);
                let _ = conn.del::<_, i32>(&key).await;
                Ok(None)
            }
        }
    }

    async fn set_link(&self, link: &TrackedLink, ttl_seconds: Option<u64>) -> CacheResult<()> {
        if !link.is_active {
            return Ok(());
        }

        let key = self.build_key(&link.slug);
        let mut conn = self.client.clone();
        let ttl = ttl_seconds.unwrap_or(self.default_ttl);

        let payload = serde_json::to_string(link)
            .map_err(|e| CacheError::OperationError(format!("Failed to encode link: {}", e)))?;

        let options = SetOptions::default()
            .conditional_set(ExistenceCheck::NX)
            .with_expiration(SetExpiry::EX(ttl));

        match conn
            .set_options::<_, _, Option<String>>(&key, payload, options)
            .await
        {
            Ok(Some(_)) => {
                debug!("Cache SET: {} (TTL: {}s)", link.slug, ttl);
                Ok(())
            }
            Ok(None) => {
                debug!("Cache SET skipped, key already present: {}", link.slug);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", link.slug, e);
                Ok(())
            }
        }
    }

    async fn invalidate(&self, slug: &str) -> CacheResult<()> {
        let key = self.build_key(slug);
        let mut conn = self.client.clone();

        match conn
            .set_ex::<_, _, ()>(&key, TOMBSTONE, self.default_ttl)
            .await
        {
            Ok(()) => {
                debug!("Cache INVALIDATE: {}", slug);
                Ok(())
            }
            Err(e) => {
                warn!("Redis tombstone write failed for {}: {}", slug, e);
                Err(CacheError::OperationError(e.to_string()))
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
