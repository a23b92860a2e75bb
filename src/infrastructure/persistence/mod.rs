//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx with
//! bound parameters throughout.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Tracked link lookup and provisioning
//! - [`PgClickRepository`] - Append-only click events
//! - [`PgMetricsRepository`] - Atomic daily rollups

pub mod pg_click_repository;
pub mod pg_link_repository;
pub mod pg_metrics_repository;

pub use pg_click_repository::PgClickRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_metrics_repository::PgMetricsRepository;
