//! PostgreSQL implementation of click event repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::device::DeviceType;
use crate::domain::entities::{ClickEvent, NewClickEvent};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;

const CLICK_COLUMNS: &str = "id, event_key, organization_id, activation_id, zone_id, agent_id, \
     tracked_link_id, ip, user_agent, referrer, device_type, is_bot, created_at";

#[derive(sqlx::FromRow)]
struct ClickEventRow {
    id: i64,
    event_key: String,
    organization_id: i64,
    activation_id: i64,
    zone_id: Option<i64>,
    agent_id: Option<i64>,
    tracked_link_id: i64,
    ip: Option<String>,
    user_agent: Option<String>,
    referrer: Option<String>,
    device_type: String,
    is_bot: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ClickEventRow> for ClickEvent {
    type Error = AppError;

    fn try_from(r: ClickEventRow) -> Result<Self, Self::Error> {
        let device_type = r
            .device_type
            .parse::<DeviceType>()
            .map_err(|e| AppError::internal(e, json!({ "click_id": r.id })))?;

        Ok(ClickEvent {
            id: r.id,
            event_key: r.event_key,
            organization_id: r.organization_id,
            activation_id: r.activation_id,
            zone_id: r.zone_id,
            agent_id: r.agent_id,
            tracked_link_id: r.tracked_link_id,
            ip: r.ip,
            user_agent: r.user_agent,
            referrer: r.referrer,
            device_type,
            is_bot: r.is_bot,
            created_at: r.created_at,
        })
    }
}

/// PostgreSQL repository for raw click events.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn insert(&self, new_event: NewClickEvent) -> Result<ClickEvent, AppError> {
        let sql = format!(
            r#"
            INSERT INTO click_events (
                event_key, organization_id, activation_id, zone_id, agent_id,
                tracked_link_id, ip, user_agent, referrer, device_type, is_bot, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (event_key) DO NOTHING
            RETURNING {CLICK_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, ClickEventRow>(&sql)
            .bind(&new_event.event_key)
            .bind(new_event.organization_id)
            .bind(new_event.activation_id)
            .bind(new_event.zone_id)
            .bind(new_event.agent_id)
            .bind(new_event.tracked_link_id)
            .bind(&new_event.ip)
            .bind(&new_event.user_agent)
            .bind(&new_event.referrer)
            .bind(new_event.device_type.as_str())
            .bind(new_event.is_bot)
            .bind(new_event.created_at)
            .fetch_optional(self.pool.as_ref())
            .await?;

        if let Some(row) = inserted {
            return ClickEvent::try_from(row);
        }

        // A previous attempt with this key already committed.
        let sql = format!("SELECT {CLICK_COLUMNS} FROM click_events WHERE event_key = $1");
        let row = sqlx::query_as::<_, ClickEventRow>(&sql)
            .bind(&new_event.event_key)
            .fetch_one(self.pool.as_ref())
            .await?;

        ClickEvent::try_from(row)
    }

    async fn count_for_link(
        &self,
        tracked_link_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM click_events
            WHERE tracked_link_id = $1
              AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
            "#,
        )
        .bind(tracked_link_id)
        .bind(from)
        .bind(to)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}
