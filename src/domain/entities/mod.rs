//! Core domain entities representing the tracking data model.
//!
//! # Entity Types
//!
//! - [`TrackedLink`] - A routable short link owned by an organization
//! - [`ClickEvent`] - One immutable redirect traversal
//! - [`DailyMetric`] - Per-link, per-day rollup of click events
//!
//! Creation inputs live next to their entity (`NewTrackedLink`,
//! `NewClickEvent`, `MetricIncrement`).

pub mod click;
pub mod daily_metric;
pub mod tracked_link;

pub use click::{ClickEvent, NewClickEvent, generate_event_key};
pub use daily_metric::{DailyMetric, MetricIncrement, visitor_key};
pub use tracked_link::{DestinationStrategy, NewTrackedLink, TrackedLink};
