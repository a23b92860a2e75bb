//! Repository trait for tracked link data access.

use crate::domain::entities::{NewTrackedLink, TrackedLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for tracked links.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_link.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Finds an active link by slug. This is the redirect hot path.
    ///
    /// Returns `Ok(None)` both for unknown and for deactivated slugs.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<TrackedLink>, AppError>;

    /// Finds a link by slug regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TrackedLink>, AppError>;

    /// Provisions a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the slug is taken.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_link: NewTrackedLink) -> Result<TrackedLink, AppError>;

    /// Sets `is_active = false`.
    ///
    /// Returns `Ok(true)` if an active link was deactivated, `Ok(false)` if the
    /// slug is unknown or already inactive.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn deactivate(&self, slug: &str) -> Result<bool, AppError>;

    /// Checks store connectivity.
    async fn health_check(&self) -> bool;
}
