//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /r/{slug}`    - Tracked link redirect (public)
//! - `GET  /health`      - Health check: DB, click queue, cache
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling
//!
//! The redirect route carries no rejecting middleware; the per-client click
//! quota is applied inside the handler.

use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/r/{slug}", get(redirect_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
