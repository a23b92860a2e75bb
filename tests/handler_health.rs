mod common;

use axum_test::TestServer;
use common::{InMemoryLinks, create_test_state, test_app};
use link_tracker::api::dto::health::HealthResponse;
use std::sync::Arc;

#[tokio::test]
async fn test_health_all_ok() {
    let links = Arc::new(InMemoryLinks::default());
    let (state, _rx) = create_test_state(links, 100);
    let server = TestServer::new(test_app(state)).unwrap();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "healthy");
    assert!(body.checks.database.is_ok());
    assert!(body.checks.click_queue.is_ok());
    assert!(body.checks.cache.is_ok());
}

#[tokio::test]
async fn test_health_database_down() {
    let links = Arc::new(InMemoryLinks::default());
    links.set_failing(true);
    let (state, _rx) = create_test_state(links, 100);
    let server = TestServer::new(test_app(state)).unwrap();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 503);
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "degraded");
    assert_eq!(body.checks.database.status, "error");
}

#[tokio::test]
async fn test_health_click_queue_closed() {
    let links = Arc::new(InMemoryLinks::default());
    let (state, rx) = create_test_state(links, 100);
    drop(rx);
    let server = TestServer::new(test_app(state)).unwrap();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 503);
    let body: HealthResponse = response.json();
    assert_eq!(body.checks.click_queue.status, "error");
}
