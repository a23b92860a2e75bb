//! HTTP layer for the public redirect endpoint.
//!
//! # Modules
//!
//! - [`dto`] - Response bodies
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Request tracing
//! - [`rate_limit`] - Per-client quota on recorded clicks

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
