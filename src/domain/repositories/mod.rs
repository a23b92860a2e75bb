//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the external store the redirect pipeline depends
//! on. Implementations live in `crate::infrastructure::persistence`; mocks
//! are generated with `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Tracked link lookup and provisioning
//! - [`ClickRepository`] - Append-only click events
//! - [`MetricsRepository`] - Atomic daily rollups
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod click_repository;
pub mod link_repository;
pub mod metrics_repository;

pub use click_repository::ClickRepository;
pub use link_repository::LinkRepository;
pub use metrics_repository::MetricsRepository;

#[cfg(test)]
pub use click_repository::MockClickRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use metrics_repository::MockMetricsRepository;
