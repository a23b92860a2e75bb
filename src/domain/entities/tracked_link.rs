//! Tracked link entity: a routable short link owned by an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a link picks its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationStrategy {
    /// Every visitor goes to `single_url`.
    Single,
    /// Destination depends on the visitor's device, with a fallback URL.
    Smart,
}

impl DestinationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationStrategy::Single => "single",
            DestinationStrategy::Smart => "smart",
        }
    }
}

impl fmt::Display for DestinationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(DestinationStrategy::Single),
            "smart" => Ok(DestinationStrategy::Smart),
            other => Err(format!("unknown destination strategy '{}'", other)),
        }
    }
}

/// A short link that can be resolved by `GET /r/{slug}`.
///
/// For `single` links `single_url` is authoritative; for `smart` links the
/// `ios_url` / `android_url` / `fallback_url` triple is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedLink {
    pub id: i64,
    pub organization_id: i64,
    pub activation_id: i64,
    pub zone_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub slug: String,
    pub destination_strategy: DestinationStrategy,
    pub single_url: Option<String>,
    pub ios_url: Option<String>,
    pub android_url: Option<String>,
    pub fallback_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TrackedLink {
    /// Creates an active single-destination link. Mostly useful in tests.
    pub fn single(id: i64, slug: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            organization_id: 1,
            activation_id: 1,
            zone_id: None,
            agent_id: None,
            slug: slug.into(),
            destination_strategy: DestinationStrategy::Single,
            single_url: Some(url.into()),
            ios_url: None,
            android_url: None,
            fallback_url: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Creates an active device-routed link. Mostly useful in tests.
    pub fn smart(
        id: i64,
        slug: impl Into<String>,
        ios_url: Option<&str>,
        android_url: Option<&str>,
        fallback_url: Option<&str>,
    ) -> Self {
        Self {
            id,
            organization_id: 1,
            activation_id: 1,
            zone_id: None,
            agent_id: None,
            slug: slug.into(),
            destination_strategy: DestinationStrategy::Smart,
            single_url: None,
            ios_url: ios_url.map(str::to_string),
            android_url: android_url.map(str::to_string),
            fallback_url: fallback_url.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Input data for provisioning a new tracked link.
#[derive(Debug, Clone)]
pub struct NewTrackedLink {
    pub organization_id: i64,
    pub activation_id: i64,
    pub zone_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub slug: String,
    pub destination_strategy: DestinationStrategy,
    pub single_url: Option<String>,
    pub ios_url: Option<String>,
    pub android_url: Option<String>,
    pub fallback_url: Option<String>,
}
