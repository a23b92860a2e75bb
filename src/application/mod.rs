//! Application layer services implementing business logic.
//!
//! Services orchestrate domain operations by coordinating repository calls,
//! caching and validation. The HTTP layer only talks to
//! [`services::RedirectService`]; the other services back the `admin` CLI.
//!
//! # Available Services
//!
//! - [`services::redirect_service::RedirectService`] - Slug resolution for `/r/{slug}`
//! - [`services::link_service::LinkService`] - Tracked link provisioning
//! - [`services::stats_service::StatsService`] - Daily metrics reports and rebuilds

pub mod services;
