//! PostgreSQL implementation of daily metrics repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{DailyMetric, MetricIncrement};
use crate::domain::repositories::MetricsRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct DailyMetricRow {
    tracked_link_id: i64,
    date: NaiveDate,
    clicks: i64,
    valid_clicks: i64,
    uniques: i64,
    updated_at: DateTime<Utc>,
}

impl From<DailyMetricRow> for DailyMetric {
    fn from(r: DailyMetricRow) -> Self {
        DailyMetric {
            tracked_link_id: r.tracked_link_id,
            date: r.date,
            clicks: r.clicks,
            valid_clicks: r.valid_clicks,
            uniques: r.uniques,
            updated_at: r.updated_at,
        }
    }
}

/// PostgreSQL repository for daily rollups.
///
/// Increments are a single `INSERT ... ON CONFLICT DO UPDATE` statement; the
/// unique-visitor insert rides along in a CTE so the whole increment commits
/// or fails together.
pub struct PgMetricsRepository {
    pool: Arc<PgPool>,
}

impl PgMetricsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsRepository for PgMetricsRepository {
    async fn upsert_daily(
        &self,
        tracked_link_id: i64,
        date: NaiveDate,
        increment: MetricIncrement,
    ) -> Result<DailyMetric, AppError> {
        let row = sqlx::query_as::<_, DailyMetricRow>(
            r#"
            WITH new_visitor AS (
                INSERT INTO daily_metric_visitors (tracked_link_id, date, visitor_key)
                SELECT $1, $2, $5::text
                WHERE $5::text IS NOT NULL
                ON CONFLICT DO NOTHING
                RETURNING 1
            )
            INSERT INTO daily_metrics (tracked_link_id, date, clicks, valid_clicks, uniques, updated_at)
            VALUES ($1, $2, $3, $4, (SELECT COUNT(*) FROM new_visitor), NOW())
            ON CONFLICT (tracked_link_id, date) DO UPDATE SET
                clicks       = daily_metrics.clicks + EXCLUDED.clicks,
                valid_clicks = daily_metrics.valid_clicks + EXCLUDED.valid_clicks,
                uniques      = daily_metrics.uniques + EXCLUDED.uniques,
                updated_at   = NOW()
            RETURNING tracked_link_id, date, clicks, valid_clicks, uniques, updated_at
            "#,
        )
        .bind(tracked_link_id)
        .bind(date)
        .bind(increment.clicks)
        .bind(increment.valid_clicks)
        .bind(increment.visitor_key)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn list_daily(
        &self,
        tracked_link_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, AppError> {
        let rows = sqlx::query_as::<_, DailyMetricRow>(
            r#"
            SELECT tracked_link_id, date, clicks, valid_clicks, uniques, updated_at
            FROM daily_metrics
            WHERE tracked_link_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
        )
        .bind(tracked_link_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(DailyMetric::from).collect())
    }

    async fn rebuild_daily(
        &self,
        tracked_link_id: i64,
        date: NaiveDate,
    ) -> Result<DailyMetric, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM daily_metric_visitors WHERE tracked_link_id = $1 AND date = $2")
            .bind(tracked_link_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO daily_metric_visitors (tracked_link_id, date, visitor_key)
            SELECT DISTINCT $1, $2::date, encode(sha256(convert_to(ip, 'UTF8')), 'hex')
            FROM click_events
            WHERE tracked_link_id = $1
              AND (created_at AT TIME ZONE 'UTC')::date = $2
              AND ip IS NOT NULL AND ip <> ''
            "#,
        )
        .bind(tracked_link_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, DailyMetricRow>(
            r#"
            WITH events AS (
                SELECT
                    COUNT(*)                             AS clicks,
                    COUNT(*) FILTER (WHERE NOT is_bot)   AS valid_clicks
                FROM click_events
                WHERE tracked_link_id = $1
                  AND (created_at AT TIME ZONE 'UTC')::date = $2
            ),
            visitors AS (
                SELECT COUNT(*) AS uniques
                FROM daily_metric_visitors
                WHERE tracked_link_id = $1 AND date = $2
            )
            INSERT INTO daily_metrics (tracked_link_id, date, clicks, valid_clicks, uniques, updated_at)
            SELECT $1, $2, events.clicks, events.valid_clicks, visitors.uniques, NOW()
            FROM events, visitors
            ON CONFLICT (tracked_link_id, date) DO UPDATE SET
                clicks       = EXCLUDED.clicks,
                valid_clicks = EXCLUDED.valid_clicks,
                uniques      = EXCLUDED.uniques,
                updated_at   = NOW()
            RETURNING tracked_link_id, date, clicks, valid_clicks, uniques, updated_at
            "#,
        )
        .bind(tracked_link_id)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }
}
