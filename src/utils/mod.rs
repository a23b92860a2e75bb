//! Utility functions for slug generation, URL processing, and request handling.
//!
//! - [`slug_generator`] - Slug generation and validation
//! - [`url_normalizer`] - Destination URL normalization
//! - [`client_ip`] - Client address extraction behind optional proxies

pub mod client_ip;
pub mod slug_generator;
pub mod url_normalizer;
