//! Business logic services for the application layer.

pub mod link_service;
pub mod redirect_service;
pub mod stats_service;

pub use link_service::{LinkDraft, LinkService};
pub use redirect_service::{RedirectDecision, RedirectOutcome, RedirectService};
pub use stats_service::{LinkReport, StatsService};
