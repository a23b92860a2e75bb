//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, worker spawning, and the Axum
//! server lifecycle including graceful shutdown.

use crate::api::rate_limit::ClickRateLimiter;
use crate::application::services::RedirectService;
use crate::config::Config;
use crate::domain::click_worker::{ClickRecorder, run_click_worker};
use crate::infrastructure::cache::{LinkCache, NullCache, RedisCache};
use crate::infrastructure::persistence::{
    PgClickRepository, PgLinkRepository, PgMetricsRepository,
};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often idle clients are dropped from the click quota table.
const QUOTA_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// How long shutdown waits for queued clicks to be written.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache (or NullCache fallback)
/// - Background click worker
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server stops accepting connections, finishes
/// in-flight requests, then waits for the click worker to drain its queue.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Migrations applied");

    let cache = connect_cache(&config).await;

    let pool = Arc::new(pool);
    let link_repository = Arc::new(PgLinkRepository::new(pool.clone()));
    let click_repository = Arc::new(PgClickRepository::new(pool.clone()));
    let metrics_repository = Arc::new(PgMetricsRepository::new(pool.clone()));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let recorder = Arc::new(ClickRecorder::new(
        click_repository,
        metrics_repository,
        config.recording_timeout(),
        config.recording_max_retries,
    ));
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        recorder,
        config.click_worker_concurrency,
    ));

    let redirect_service = Arc::new(RedirectService::new(
        link_repository,
        cache,
        config.default_destination_url.clone(),
        config.cache_ttl_seconds,
    ));

    let state = AppState::new(redirect_service, click_tx, config.behind_proxy);
    spawn_quota_cleanup(Arc::clone(&state.click_limiter));

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Every sender lived in the router, so the channel is closed by now.
    tracing::info!("Server stopped, draining click queue");
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Click worker panicked: {}", e),
        Err(_) => tracing::warn!(
            "Click queue not drained within {}s, remaining clicks are lost",
            WORKER_DRAIN_TIMEOUT.as_secs()
        ),
    }

    pool.close().await;

    Ok(())
}

/// Drops idle clients from the click quota table once a minute.
fn spawn_quota_cleanup(limiter: Arc<ClickRateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(QUOTA_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.retain_recent();
        }
    });
}

async fn connect_database(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn connect_cache(config: &Config) -> Arc<dyn LinkCache> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
