//! Tracked link provisioning and lifecycle service.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::domain::entities::{DestinationStrategy, NewTrackedLink, TrackedLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::LinkCache;
use crate::utils::slug_generator::{generate_slug, validate_slug};
use crate::utils::url_normalizer::normalize_optional_url;

/// Operator input for a new tracked link.
///
/// Setting `single_url` makes a `single` link; setting any of the device URLs
/// makes a `smart` link. Mixing the two is rejected.
#[derive(Debug, Clone, Default, Validate)]
pub struct LinkDraft {
    #[validate(range(min = 1, message = "organization id must be positive"))]
    pub organization_id: i64,

    #[validate(range(min = 1, message = "activation id must be positive"))]
    pub activation_id: i64,

    #[validate(range(min = 1, message = "zone id must be positive"))]
    pub zone_id: Option<i64>,

    #[validate(range(min = 1, message = "agent id must be positive"))]
    pub agent_id: Option<i64>,

    /// Generated when absent.
    pub slug: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub single_url: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub ios_url: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub android_url: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub fallback_url: Option<String>,
}

/// Service for provisioning and deactivating tracked links.
///
/// Handles slug generation/validation and destination normalization, and
/// keeps the redirect cache consistent when links are deactivated.
pub struct LinkService<L: LinkRepository> {
    link_repository: Arc<L>,
    cache: Arc<dyn LinkCache>,
}

impl<L: LinkRepository> LinkService<L> {
    /// Creates a new link service.
    pub fn new(link_repository: Arc<L>, cache: Arc<dyn LinkCache>) -> Self {
        Self {
            link_repository,
            cache,
        }
    }

    /// Provisions a tracked link from an operator draft.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if:
    /// - An id is not positive
    /// - A URL is invalid or not HTTP(S)
    /// - No destination is given, or single and device URLs are mixed
    /// - A custom slug breaks the slug rules
    ///
    /// Returns [`AppError::Conflict`] if the custom slug is taken.
    pub async fn create_link(&self, draft: LinkDraft) -> Result<TrackedLink, AppError> {
        draft.validate().map_err(|e| {
            AppError::bad_request("Invalid link", json!({ "errors": e.to_string() }))
        })?;

        let single_url = normalize(draft.single_url.as_deref(), "single_url")?;
        let ios_url = normalize(draft.ios_url.as_deref(), "ios_url")?;
        let android_url = normalize(draft.android_url.as_deref(), "android_url")?;
        let fallback_url = normalize(draft.fallback_url.as_deref(), "fallback_url")?;

        let has_device_urls = ios_url.is_some() || android_url.is_some() || fallback_url.is_some();

        let destination_strategy = match (single_url.is_some(), has_device_urls) {
            (true, false) => DestinationStrategy::Single,
            (false, true) => DestinationStrategy::Smart,
            (true, true) => {
                return Err(AppError::bad_request(
                    "A link is either single or smart, not both",
                    json!({ "hint": "use --url alone, or --ios/--android/--fallback" }),
                ));
            }
            (false, false) => {
                return Err(AppError::bad_request(
                    "A link needs at least one destination URL",
                    json!({}),
                ));
            }
        };

        let slug = match draft.slug {
            Some(custom) => {
                validate_slug(&custom)?;

                if self.link_repository.find_by_slug(&custom).await?.is_some() {
                    return Err(AppError::conflict(
                        "Slug already exists",
                        json!({ "slug": custom }),
                    ));
                }

                custom
            }
            None => self.generate_unique_slug().await?,
        };

        let link = self
            .link_repository
            .create(NewTrackedLink {
                organization_id: draft.organization_id,
                activation_id: draft.activation_id,
                zone_id: draft.zone_id,
                agent_id: draft.agent_id,
                slug,
                destination_strategy,
                single_url,
                ios_url,
                android_url,
                fallback_url,
            })
            .await?;

        info!(link_id = link.id, slug = %link.slug, strategy = %link.destination_strategy, "Tracked link created");

        Ok(link)
    }

    /// Retrieves a link by slug, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this slug.
    pub async fn get_link(&self, slug: &str) -> Result<TrackedLink, AppError> {
        self.link_repository
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "slug": slug })))
    }

    /// Deactivates a link and evicts it from the redirect cache.
    ///
    /// Returns `false` if the link was already inactive.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this slug.
    pub async fn deactivate(&self, slug: &str) -> Result<bool, AppError> {
        let changed = self.link_repository.deactivate(slug).await?;

        if !changed {
            // Distinguish "already inactive" from "never existed".
            self.get_link(slug).await?;
        }

        if let Err(e) = self.cache.invalidate(slug).await {
            warn!(slug, error = %e, "Failed to evict link from cache, entry expires with its TTL");
        }

        if changed {
            info!(slug, "Tracked link deactivated");
        }

        Ok(changed)
    }

    /// Generates a slug that no link uses yet.
    ///
    /// Attempts up to 10 times before failing.
    async fn generate_unique_slug(&self) -> Result<String, AppError> {
        const MAX_ATTEMPTS: usize = 10;

        for _ in 0..MAX_ATTEMPTS {
            let slug = generate_slug()?;

            if self.link_repository.find_by_slug(&slug).await?.is_none() {
                return Ok(slug);
            }
        }

        Err(AppError::internal(
            "Failed to generate unique slug",
            json!({ "reason": "Too many collisions" }),
        ))
    }
}

fn normalize(url: Option<&str>, field: &str) -> Result<Option<String>, AppError> {
    normalize_optional_url(url).map_err(|e| {
        AppError::bad_request(
            "Invalid URL format",
            json!({ "field": field, "reason": e.to_string() }),
        )
    })
}
