//! In-memory click model passed from the redirect handler to the worker.

use chrono::{DateTime, Utc};

use crate::domain::device::DeviceType;
use crate::domain::entities::{NewClickEvent, TrackedLink, generate_event_key};

/// A click waiting to be persisted.
///
/// Carries a snapshot of the link's tenancy ids so the worker never has to
/// look the link up again, and the click timestamp taken on the request path
/// so queueing delay cannot move a click into the next day.
///
/// # Usage Flow
///
/// 1. Built in [`crate::api::handlers::redirect_handler`] after resolution
/// 2. Sent to the bounded channel with `try_send` (never awaits)
/// 3. Consumed by [`crate::domain::click_worker::run_click_worker`]
/// 4. Turned into a [`NewClickEvent`] and a metrics increment
#[derive(Debug, Clone)]
pub struct PendingClick {
    pub tracked_link_id: i64,
    pub organization_id: i64,
    pub activation_id: i64,
    pub zone_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub device_type: DeviceType,
    pub is_bot: bool,
    pub clicked_at: DateTime<Utc>,
}

impl PendingClick {
    pub fn new(
        link: &TrackedLink,
        device_type: DeviceType,
        is_bot: bool,
        ip: Option<String>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> Self {
        Self {
            tracked_link_id: link.id,
            organization_id: link.organization_id,
            activation_id: link.activation_id,
            zone_id: link.zone_id,
            agent_id: link.agent_id,
            ip,
            user_agent: user_agent.map(|s| s.to_string()),
            referrer: referrer.map(|s| s.to_string()),
            device_type,
            is_bot,
            clicked_at: Utc::now(),
        }
    }

    /// Builds the row to insert, with a fresh idempotency key.
    pub fn to_new_event(&self) -> NewClickEvent {
        NewClickEvent {
            event_key: generate_event_key(),
            organization_id: self.organization_id,
            activation_id: self.activation_id,
            zone_id: self.zone_id,
            agent_id: self.agent_id,
            tracked_link_id: self.tracked_link_id,
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
            referrer: self.referrer.clone(),
            device_type: self.device_type,
            is_bot: self.is_bot,
            created_at: self.clicked_at,
        }
    }
}
