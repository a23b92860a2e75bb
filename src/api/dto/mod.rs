//! Data Transfer Objects for HTTP responses.
//!
//! The redirect endpoint answers with headers only; the health endpoint is
//! the one JSON surface.

pub mod health;
