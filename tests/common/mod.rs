#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, extract::ConnectInfo, routing::get};
use chrono::{NaiveDate, Utc};
use link_tracker::api::handlers::{health_handler, redirect_handler};
use link_tracker::application::services::RedirectService;
use link_tracker::domain::entities::{
    ClickEvent, DailyMetric, MetricIncrement, NewClickEvent, NewTrackedLink, TrackedLink,
};
use link_tracker::domain::pending_click::PendingClick;
use link_tracker::domain::repositories::{ClickRepository, LinkRepository, MetricsRepository};
use link_tracker::error::AppError;
use link_tracker::routes::app_router;
use link_tracker::infrastructure::cache::{CacheResult, LinkCache, NullCache};
use link_tracker::state::AppState;
use serde_json::json;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tower::Layer;

pub const DEFAULT_URL: &str = "https://default.example.com/";

pub const ANDROID_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36";
pub const IPHONE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
pub const DESKTOP_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const BOT_UA: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// The `promo1` link used across the end-to-end tests.
pub fn promo1() -> TrackedLink {
    TrackedLink::smart(
        1,
        "promo1",
        Some("https://apps.apple.com/x"),
        Some("https://play.google.com/x"),
        Some("https://example.com"),
    )
}

/// Link store backed by a vector. Can be switched into a failing mode.
#[derive(Default)]
pub struct InMemoryLinks {
    links: Mutex<Vec<TrackedLink>>,
    failing: AtomicBool,
}

impl InMemoryLinks {
    pub fn with(links: Vec<TrackedLink>) -> Self {
        Self {
            links: Mutex::new(links),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::internal("Database error", json!({})))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinks {
    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<TrackedLink>, AppError> {
        self.check()?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.slug == slug && l.is_active)
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TrackedLink>, AppError> {
        self.check()?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.slug == slug)
            .cloned())
    }

    async fn create(&self, new_link: NewTrackedLink) -> Result<TrackedLink, AppError> {
        self.check()?;
        let mut links = self.links.lock().unwrap();
        if links.iter().any(|l| l.slug == new_link.slug) {
            return Err(AppError::conflict("Unique constraint violation", json!({})));
        }
        let link = TrackedLink {
            id: links.len() as i64 + 1,
            organization_id: new_link.organization_id,
            activation_id: new_link.activation_id,
            zone_id: new_link.zone_id,
            agent_id: new_link.agent_id,
            slug: new_link.slug,
            destination_strategy: new_link.destination_strategy,
            single_url: new_link.single_url,
            ios_url: new_link.ios_url,
            android_url: new_link.android_url,
            fallback_url: new_link.fallback_url,
            is_active: true,
            created_at: Utc::now(),
        };
        links.push(link.clone());
        Ok(link)
    }

    async fn deactivate(&self, slug: &str) -> Result<bool, AppError> {
        self.check()?;
        let mut links = self.links.lock().unwrap();
        match links.iter_mut().find(|l| l.slug == slug && l.is_active) {
            Some(link) => {
                link.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

/// Append-only click store, idempotent by `event_key`.
#[derive(Default)]
pub struct InMemoryClicks {
    events: Mutex<Vec<ClickEvent>>,
}

impl InMemoryClicks {
    pub fn all(&self) -> Vec<ClickEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClickRepository for InMemoryClicks {
    async fn insert(&self, new_event: NewClickEvent) -> Result<ClickEvent, AppError> {
        let mut events = self.events.lock().unwrap();
        if let Some(existing) = events.iter().find(|e| e.event_key == new_event.event_key) {
            return Ok(existing.clone());
        }
        let event = new_event.into_event(events.len() as i64 + 1);
        events.push(event.clone());
        Ok(event)
    }

    async fn count_for_link(
        &self,
        tracked_link_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, AppError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                let day = e.created_at.date_naive();
                e.tracked_link_id == tracked_link_id && day >= from && day <= to
            })
            .count() as i64)
    }
}

/// Daily rollups; each upsert is atomic under one lock, like the SQL statement.
#[derive(Default)]
pub struct InMemoryMetrics {
    state: Mutex<MetricsState>,
}

#[derive(Default)]
struct MetricsState {
    rows: HashMap<(i64, NaiveDate), DailyMetric>,
    visitors: HashSet<(i64, NaiveDate, String)>,
}

impl InMemoryMetrics {
    pub fn get(&self, tracked_link_id: i64, date: NaiveDate) -> Option<DailyMetric> {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(&(tracked_link_id, date))
            .cloned()
    }
}

#[async_trait]
impl MetricsRepository for InMemoryMetrics {
    async fn upsert_daily(
        &self,
        tracked_link_id: i64,
        date: NaiveDate,
        increment: MetricIncrement,
    ) -> Result<DailyMetric, AppError> {
        let mut state = self.state.lock().unwrap();

        let new_visitor = match increment.visitor_key {
            Some(key) => state.visitors.insert((tracked_link_id, date, key)),
            None => false,
        };

        let row = state
            .rows
            .entry((tracked_link_id, date))
            .or_insert_with(|| DailyMetric {
                tracked_link_id,
                date,
                clicks: 0,
                valid_clicks: 0,
                uniques: 0,
                updated_at: Utc::now(),
            });
        row.clicks += increment.clicks;
        row.valid_clicks += increment.valid_clicks;
        row.uniques += i64::from(new_visitor);
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn list_daily(
        &self,
        tracked_link_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, AppError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<DailyMetric> = state
            .rows
            .values()
            .filter(|m| m.tracked_link_id == tracked_link_id && m.date >= from && m.date <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.date);
        Ok(rows)
    }

    async fn rebuild_daily(
        &self,
        _tracked_link_id: i64,
        _date: NaiveDate,
    ) -> Result<DailyMetric, AppError> {
        Err(AppError::internal(
            "Rebuild needs raw events from the store",
            json!({}),
        ))
    }
}

/// Link cache with the same fill and tombstone rules as the Redis cache,
/// without expiry.
#[derive(Default)]
pub struct InMemoryCache {
    slots: Mutex<HashMap<String, Option<TrackedLink>>>,
}

impl InMemoryCache {
    pub fn holds_link(&self, slug: &str) -> bool {
        matches!(self.slots.lock().unwrap().get(slug), Some(Some(_)))
    }
}

#[async_trait]
impl LinkCache for InMemoryCache {
    async fn get_link(&self, slug: &str) -> CacheResult<Option<TrackedLink>> {
        Ok(self.slots.lock().unwrap().get(slug).cloned().flatten())
    }

    async fn set_link(&self, link: &TrackedLink, _ttl_seconds: Option<u64>) -> CacheResult<()> {
        if link.is_active {
            self.slots
                .lock()
                .unwrap()
                .entry(link.slug.clone())
                .or_insert_with(|| Some(link.clone()));
        }
        Ok(())
    }

    async fn invalidate(&self, slug: &str) -> CacheResult<()> {
        self.slots.lock().unwrap().insert(slug.to_string(), None);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Builds handler state over the given link store, with no cache.
pub fn create_test_state(
    links: Arc<InMemoryLinks>,
    queue_capacity: usize,
) -> (AppState, mpsc::Receiver<PendingClick>) {
    let (tx, rx) = mpsc::channel(queue_capacity);

    let redirect_service = Arc::new(RedirectService::new(
        links,
        Arc::new(NullCache::new()),
        DEFAULT_URL,
        300,
    ));

    (AppState::new(redirect_service, tx, false), rx)
}

/// Redirect and health routes with a fake peer address.
pub fn test_app(state: AppState) -> Router {
    Router::new()
        .route("/r/{slug}", get(redirect_handler))
        .route("/health", get(health_handler))
        .layer(MockConnectInfoLayer)
        .with_state(state)
}

/// The production router, with a fake peer address.
pub fn production_app(state: AppState) -> Router {
    Router::new()
        .fallback_service(app_router(state))
        .layer(MockConnectInfoLayer)
}

/// Inserts the organization/activation rows a tracked link needs.
pub async fn create_test_activation(pool: &PgPool, org_name: &str) -> (i64, i64) {
    let organization_id: i64 =
        sqlx::query_scalar("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
            .bind(org_name)
            .fetch_one(pool)
            .await
            .unwrap();

    let activation_id: i64 = sqlx::query_scalar(
        "INSERT INTO activations (organization_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(organization_id)
    .bind(format!("{org_name} launch"))
    .fetch_one(pool)
    .await
    .unwrap();

    (organization_id, activation_id)
}

/// Inserts a zone under `activation_id`.
pub async fn create_test_zone(pool: &PgPool, activation_id: i64, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO zones (activation_id, name) VALUES ($1, $2) RETURNING id")
        .bind(activation_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Inserts a field agent under `activation_id`, optionally assigned to a zone.
pub async fn create_test_agent(
    pool: &PgPool,
    activation_id: i64,
    zone_id: Option<i64>,
    name: &str,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO agents (activation_id, zone_id, name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(activation_id)
    .bind(zone_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
