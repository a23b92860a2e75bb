//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{DestinationStrategy, NewTrackedLink, TrackedLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "l.id, l.organization_id, l.activation_id, l.zone_id, l.agent_id, \
     l.slug, l.destination_strategy, l.single_url, l.ios_url, l.android_url, \
     l.fallback_url, l.is_active, l.created_at";

#[derive(sqlx::FromRow)]
struct TrackedLinkRow {
    id: i64,
    organization_id: i64,
    activation_id: i64,
    zone_id: Option<i64>,
    agent_id: Option<i64>,
    slug: String,
    destination_strategy: String,
    single_url: Option<String>,
    ios_url: Option<String>,
    android_url: Option<String>,
    fallback_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<TrackedLinkRow> for TrackedLink {
    type Error = AppError;

    fn try_from(r: TrackedLinkRow) -> Result<Self, Self::Error> {
        let destination_strategy = r
            .destination_strategy
            .parse::<DestinationStrategy>()
            .map_err(|e| AppError::internal(e, json!({ "link_id": r.id })))?;

        Ok(TrackedLink {
            id: r.id,
            organization_id: r.organization_id,
            activation_id: r.activation_id,
            zone_id: r.zone_id,
            agent_id: r.agent_id,
            slug: r.slug,
            destination_strategy,
            single_url: r.single_url,
            ios_url: r.ios_url,
            android_url: r.android_url,
            fallback_url: r.fallback_url,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

/// PostgreSQL repository for tracked links.
///
/// Lookups join `activations` on both the activation and organization id, so
/// a link whose tenancy ids disagree with its activation never resolves.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<TrackedLink>, AppError> {
        let sql = format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM tracked_links l
            JOIN activations a
              ON a.id = l.activation_id AND a.organization_id = l.organization_id
            WHERE l.slug = $1 AND l.is_active = TRUE
            "#
        );

        let row = sqlx::query_as::<_, TrackedLinkRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(TrackedLink::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TrackedLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM tracked_links l WHERE l.slug = $1");

        let row = sqlx::query_as::<_, TrackedLinkRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(TrackedLink::try_from).transpose()
    }

    async fn create(&self, new_link: NewTrackedLink) -> Result<TrackedLink, AppError> {
        let sql = format!(
            r#"
            INSERT INTO tracked_links AS l (
                organization_id, activation_id, zone_id, agent_id, slug,
                destination_strategy, single_url, ios_url, android_url, fallback_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LINK_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TrackedLinkRow>(&sql)
            .bind(new_link.organization_id)
            .bind(new_link.activation_id)
            .bind(new_link.zone_id)
            .bind(new_link.agent_id)
            .bind(&new_link.slug)
            .bind(new_link.destination_strategy.as_str())
            .bind(&new_link.single_url)
            .bind(&new_link.ios_url)
            .bind(&new_link.android_url)
            .bind(&new_link.fallback_url)
            .fetch_one(self.pool.as_ref())
            .await?;

        TrackedLink::try_from(row)
    }

    async fn deactivate(&self, slug: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE tracked_links SET is_active = FALSE WHERE slug = $1 AND is_active = TRUE",
        )
        .bind(slug)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
