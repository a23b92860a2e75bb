//! Redirect resolution: slug lookup, classification and destination choice.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::bot::is_bot;
use crate::domain::destination::{Destination, DestinationSource, resolve_destination};
use crate::domain::device::{DeviceType, classify_device};
use crate::domain::entities::TrackedLink;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::LinkCache;

/// Everything the handler needs to answer and to queue the click.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectDecision {
    pub link: TrackedLink,
    pub device_type: DeviceType,
    pub is_bot: bool,
    pub destination: Destination,
}

/// Result of resolving a slug for a visitor.
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectOutcome {
    /// The link was found; the click should be recorded.
    Tracked(RedirectDecision),
    /// The store could not be reached. The visitor still gets the default
    /// destination, but nothing is recorded because the link is unknown.
    Degraded { location: String },
}

impl RedirectOutcome {
    pub fn location(&self) -> &str {
        match self {
            RedirectOutcome::Tracked(decision) => &decision.destination.url,
            RedirectOutcome::Degraded { location } => location,
        }
    }
}

/// Resolves `GET /r/{slug}` requests.
///
/// Link lookups go through a pull-through [`LinkCache`]; the cache only ever
/// holds active links and is invalidated when a link is deactivated.
pub struct RedirectService {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn LinkCache>,
    default_destination_url: String,
    cache_ttl_seconds: u64,
}

impl RedirectService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: Arc<dyn LinkCache>,
        default_destination_url: impl Into<String>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            links,
            cache,
            default_destination_url: default_destination_url.into(),
            cache_ttl_seconds,
        }
    }

    pub fn default_destination_url(&self) -> &str {
        &self.default_destination_url
    }

    /// Store health, for `/health`.
    pub async fn store_healthy(&self) -> bool {
        self.links.health_check().await
    }

    /// Cache health, for `/health`.
    pub async fn cache_healthy(&self) -> bool {
        self.cache.health_check().await
    }

    /// Resolves `slug` for a visitor with the given `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::link_not_found`] for unknown and inactive slugs
    /// alike. Store failures do not surface as errors; they produce
    /// [`RedirectOutcome::Degraded`].
    pub async fn resolve(
        &self,
        slug: &str,
        user_agent: Option<&str>,
    ) -> Result<RedirectOutcome, AppError> {
        let link = match self.find_active_link(slug).await {
            Ok(link) => link,
            Err(e) if e.is_not_found() => return Err(AppError::link_not_found()),
            Err(e) => {
                error!(slug, error = %e, "Link lookup failed, redirecting to default destination");
                metrics::counter!("link_tracker_degraded_redirects_total").increment(1);
                return Ok(RedirectOutcome::Degraded {
                    location: self.default_destination_url.clone(),
                });
            }
        };

        let user_agent = user_agent.unwrap_or_default();
        let device_type = classify_device(user_agent);
        let is_bot = is_bot(user_agent);
        let destination = resolve_destination(&link, device_type, &self.default_destination_url);

        match destination.source {
            DestinationSource::Strategy => {}
            DestinationSource::LinkFallback => warn!(
                link_id = link.id,
                slug = %link.slug,
                strategy = %link.destination_strategy,
                device = %device_type,
                "Strategy produced no URL, used another destination on the link"
            ),
            DestinationSource::GlobalDefault => error!(
                link_id = link.id,
                slug = %link.slug,
                strategy = %link.destination_strategy,
                "Link has no usable destination, used global default"
            ),
        }

        Ok(RedirectOutcome::Tracked(RedirectDecision {
            link,
            device_type,
            is_bot,
            destination,
        }))
    }

    /// Looks up an active link, cache first.
    ///
    /// Cache failures are logged and treated as misses.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no active link has this slug, or
    /// the store's error when the lookup itself fails.
    pub async fn find_active_link(&self, slug: &str) -> Result<TrackedLink, AppError> {
        match self.cache.get_link(slug).await {
            Ok(Some(link)) => {
                debug!(slug, "Cache HIT");
                return Ok(link);
            }
            Ok(None) => debug!(slug, "Cache MISS"),
            Err(e) => warn!(slug, error = %e, "Cache read failed, falling back to store"),
        }

        let link = self
            .links
            .find_active_by_slug(slug)
            .await?
            .ok_or_else(AppError::link_not_found)?;

        let cache = Arc::clone(&self.cache);
        let cached = link.clone();
        let ttl = self.cache_ttl_seconds;
        tokio::spawn(async move {
            if let Err(e) = cache.set_link(&cached, Some(ttl)).await {
                warn!(slug = %cached.slug, error = %e, "Failed to cache link");
            }
        });

        Ok(link)
    }
}
