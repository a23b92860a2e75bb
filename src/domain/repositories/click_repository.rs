//! Repository trait for raw click events.

use crate::domain::entities::{ClickEvent, NewClickEvent};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Append-only store of click events.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Inserts a click event.
    ///
    /// Idempotent on `event_key`: a second insert with the same key returns
    /// the stored row and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn insert(&self, new_event: NewClickEvent) -> Result<ClickEvent, AppError>;

    /// Counts raw events for a link between two UTC days, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn count_for_link(
        &self,
        tracked_link_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, AppError>;
}
