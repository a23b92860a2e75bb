//! Click event entity: one immutable record per redirect.

use chrono::{DateTime, Utc};

use crate::domain::device::DeviceType;

/// A persisted click on a tracked link.
///
/// Rows are append-only. Tenancy ids are copied from the link at click time.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub id: i64,
    pub event_key: String,
    pub organization_id: i64,
    pub activation_id: i64,
    pub zone_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub tracked_link_id: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub device_type: DeviceType,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

impl ClickEvent {
    /// A click counts towards `valid_clicks` unless it came from a bot.
    pub fn is_valid(&self) -> bool {
        !self.is_bot
    }
}

/// Input data for inserting a click event.
///
/// `event_key` is unique per click; inserting the same key twice yields the
/// original row, which makes retried inserts safe.
#[derive(Debug, Clone)]
pub struct NewClickEvent {
    pub event_key: String,
    pub organization_id: i64,
    pub activation_id: i64,
    pub zone_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub tracked_link_id: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub device_type: DeviceType,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

impl NewClickEvent {
    /// Materializes the row the store would return for this input.
    pub fn into_event(self, id: i64) -> ClickEvent {
        ClickEvent {
            id,
            event_key: self.event_key,
            organization_id: self.organization_id,
            activation_id: self.activation_id,
            zone_id: self.zone_id,
            agent_id: self.agent_id,
            tracked_link_id: self.tracked_link_id,
            ip: self.ip,
            user_agent: self.user_agent,
            referrer: self.referrer,
            device_type: self.device_type,
            is_bot: self.is_bot,
            created_at: self.created_at,
        }
    }
}

/// Generates a random 128-bit click key, hex encoded.
pub fn generate_event_key() -> String {
    format!("{:032x}", rand::random::<u128>())
}
