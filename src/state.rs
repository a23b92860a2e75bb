//! Shared state injected into every handler.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::rate_limit::ClickRateLimiter;
use crate::application::services::RedirectService;
use crate::domain::pending_click::PendingClick;

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone; every field is a handle. The click sender is the only
/// write path from requests into the background worker.
#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<RedirectService>,
    pub click_sender: mpsc::Sender<PendingClick>,
    /// Clicks over a client's quota are redirected but not recorded.
    pub click_limiter: Arc<ClickRateLimiter>,
    /// Read the client IP from forwarding headers instead of the socket.
    pub behind_proxy: bool,
}

impl AppState {
    /// Creates state with the default per-client click quota.
    pub fn new(
        redirect_service: Arc<RedirectService>,
        click_sender: mpsc::Sender<PendingClick>,
        behind_proxy: bool,
    ) -> Self {
        Self {
            redirect_service,
            click_sender,
            click_limiter: Arc::new(ClickRateLimiter::default()),
            behind_proxy,
        }
    }

    pub fn with_click_limiter(mut self, limiter: ClickRateLimiter) -> Self {
        self.click_limiter = Arc::new(limiter);
        self
    }
}
