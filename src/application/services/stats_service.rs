//! Daily metrics reporting and maintenance service.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::domain::entities::{DailyMetric, TrackedLink};
use crate::domain::repositories::{ClickRepository, MetricsRepository};
use crate::error::AppError;

/// Longest report window, in days.
pub const MAX_REPORT_DAYS: i64 = 366;

/// Rollups for one link over a date range.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub tracked_link_id: i64,
    pub slug: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DailyRow>,
    pub total_clicks: i64,
    pub total_valid_clicks: i64,
    /// Raw click events in the range. Differs from `total_clicks` only when a
    /// rollup increment was lost; `metrics rebuild` repairs the day.
    pub raw_clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub clicks: i64,
    pub valid_clicks: i64,
    pub uniques: i64,
}

impl From<DailyMetric> for DailyRow {
    fn from(m: DailyMetric) -> Self {
        Self {
            date: m.date,
            clicks: m.clicks,
            valid_clicks: m.valid_clicks,
            uniques: m.uniques,
        }
    }
}

impl LinkReport {
    pub fn is_consistent(&self) -> bool {
        self.total_clicks == self.raw_clicks
    }
}

/// Service for reading and repairing daily rollups.
///
/// Rollups are written by the click worker; this service only reads them and
/// recomputes them from raw events on request.
pub struct StatsService<M: MetricsRepository, C: ClickRepository> {
    metrics_repository: Arc<M>,
    click_repository: Arc<C>,
}

impl<M: MetricsRepository, C: ClickRepository> StatsService<M, C> {
    /// Creates a new statistics service.
    pub fn new(metrics_repository: Arc<M>, click_repository: Arc<C>) -> Self {
        Self {
            metrics_repository,
            click_repository,
        }
    }

    /// Builds the daily report for `link` between `from` and `to` inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the range is inverted or longer
    /// than [`MAX_REPORT_DAYS`].
    pub async fn link_report(
        &self,
        link: &TrackedLink,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<LinkReport, AppError> {
        validate_range(from, to)?;

        let metrics = self
            .metrics_repository
            .list_daily(link.id, from, to)
            .await?;
        let raw_clicks = self
            .click_repository
            .count_for_link(link.id, from, to)
            .await?;

        let total_clicks = metrics.iter().map(|m| m.clicks).sum();
        let total_valid_clicks = metrics.iter().map(|m| m.valid_clicks).sum();

        Ok(LinkReport {
            tracked_link_id: link.id,
            slug: link.slug.clone(),
            from,
            to,
            days: metrics.into_iter().map(DailyRow::from).collect(),
            total_clicks,
            total_valid_clicks,
            raw_clicks,
        })
    }

    /// Recomputes the rollup for `link` on `date` from raw click events.
    pub async fn rebuild_day(
        &self,
        link: &TrackedLink,
        date: NaiveDate,
    ) -> Result<DailyMetric, AppError> {
        let metric = self.metrics_repository.rebuild_daily(link.id, date).await?;

        info!(
            link_id = link.id,
            slug = %link.slug,
            %date,
            clicks = metric.clicks,
            valid_clicks = metric.valid_clicks,
            uniques = metric.uniques,
            "Daily metric rebuilt"
        );

        Ok(metric)
    }
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), AppError> {
    if from > to {
        return Err(AppError::bad_request(
            "Start date must not be after end date",
            json!({ "from": from, "to": to }),
        ));
    }

    let days = (to - from).num_days() + 1;
    if days > MAX_REPORT_DAYS {
        return Err(AppError::bad_request(
            format!("Report range is limited to {MAX_REPORT_DAYS} days"),
            json!({ "requested_days": days }),
        ));
    }

    Ok(())
}
