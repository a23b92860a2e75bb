//! Handler for tracked link redirects.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use std::net::SocketAddr;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::application::services::RedirectOutcome;
use crate::domain::pending_click::PendingClick;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Redirects a tracked link to its destination and queues the click.
///
/// # Endpoint
///
/// `GET /r/{slug}`
///
/// # Request Flow
///
/// 1. Look up the active link (cache, then store)
/// 2. Classify the device and bot flag from `User-Agent`
/// 3. Resolve the destination for that device
/// 4. Queue a [`PendingClick`] with `try_send` (never waits)
/// 5. Return 302 Found
///
/// Query strings play no part in matching.
///
/// # Click Tracking
///
/// Clicks over the client's quota are not queued. A full or closed queue
/// drops the click with a warning. Recording never changes the response.
///
/// # Errors
///
/// Returns 404 Not Found for unknown and deactivated slugs, with the same body
/// for both. When the store is unreachable the visitor is sent to the default
/// destination instead and nothing is recorded.
pub async fn redirect_handler(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, AppError> {
    let user_agent = header_str(&headers, header::USER_AGENT);

    let outcome = state.redirect_service.resolve(&slug, user_agent).await?;
    let location = outcome.location().to_string();

    if let RedirectOutcome::Tracked(decision) = outcome {
        let ip = client_ip(&headers, addr, state.behind_proxy);

        if !state.click_limiter.allows(ip) {
            metrics::counter!("link_tracker_clicks_dropped_total", "reason" => "rate_limited")
                .increment(1);
            debug!(link_id = decision.link.id, %ip, "Click quota exceeded, not recording");
        } else {
            let click = PendingClick::new(
                &decision.link,
                decision.device_type,
                decision.is_bot,
                Some(ip.to_string()),
                user_agent,
                header_str(&headers, header::REFERER),
            );
            queue_click(&state, click);
        }
    }

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}

fn queue_click(state: &AppState, click: PendingClick) {
    match state.click_sender.try_send(click) {
        Ok(()) => {}
        Err(TrySendError::Full(click)) => {
            metrics::counter!("link_tracker_clicks_dropped_total", "reason" => "queue_full")
                .increment(1);
            warn!(
                link_id = click.tracked_link_id,
                "Click queue full, dropping click"
            );
        }
        Err(TrySendError::Closed(click)) => {
            metrics::counter!("link_tracker_clicks_dropped_total", "reason" => "queue_closed")
                .increment(1);
            warn!(
                link_id = click.tracked_link_id,
                "Click queue closed, dropping click"
            );
        }
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
