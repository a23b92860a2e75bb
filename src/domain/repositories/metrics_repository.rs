//! Repository trait for daily click rollups.

use crate::domain::entities::{DailyMetric, MetricIncrement};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Store of per-link daily rollups.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMetricsRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_metrics.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Creates or increments the rollup row for `(tracked_link_id, date)`.
    ///
    /// Must be atomic per call: concurrent increments on the same row may
    /// never lose updates. Implementations must not read the counters and
    /// write them back in separate steps.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn upsert_daily(
        &self,
        tracked_link_id: i64,
        date: NaiveDate,
        increment: MetricIncrement,
    ) -> Result<DailyMetric, AppError>;

    /// Lists rollups for a link between two days, inclusive, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list_daily(
        &self,
        tracked_link_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, AppError>;

    /// Recomputes one rollup row from raw click events, replacing its counters.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn rebuild_daily(
        &self,
        tracked_link_id: i64,
        date: NaiveDate,
    ) -> Result<DailyMetric, AppError>;
}
