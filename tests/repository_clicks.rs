mod common;

use chrono::{Duration, Utc};
use link_tracker::domain::device::DeviceType;
use link_tracker::domain::entities::{
    DestinationStrategy, NewTrackedLink, TrackedLink, generate_event_key,
};
use link_tracker::domain::pending_click::PendingClick;
use link_tracker::domain::repositories::{ClickRepository, LinkRepository};
use link_tracker::infrastructure::persistence::{PgClickRepository, PgLinkRepository};
use sqlx::PgPool;
use std::sync::Arc;

async fn create_link(pool: &PgPool, slug: &str) -> TrackedLink {
    let (organization_id, activation_id) = common::create_test_activation(pool, "Acme").await;
    PgLinkRepository::new(Arc::new(pool.clone()))
        .create(NewTrackedLink {
            organization_id,
            activation_id,
            zone_id: None,
            agent_id: None,
            slug: slug.to_string(),
            destination_strategy: DestinationStrategy::Single,
            single_url: Some("https://example.com".to_string()),
            ios_url: None,
            android_url: None,
            fallback_url: None,
        })
        .await
        .unwrap()
}

#[sqlx::test]
async fn test_insert_click(pool: PgPool) {
    let link = create_link(&pool, "promo1").await;
    let repo = PgClickRepository::new(Arc::new(pool));

    let click = PendingClick::new(
        &link,
        DeviceType::Android,
        false,
        Some("203.0.113.7".to_string()),
        Some("Mozilla/5.0 (Linux; Android 14)"),
        Some("https://instagram.com/"),
    );
    let event = repo.insert(click.to_new_event()).await.unwrap();

    assert_eq!(event.tracked_link_id, link.id);
    assert_eq!(event.organization_id, link.organization_id);
    assert_eq!(event.activation_id, link.activation_id);
    assert_eq!(event.device_type, DeviceType::Android);
    assert!(!event.is_bot);
    assert_eq!(event.ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(event.referrer.as_deref(), Some("https://instagram.com/"));
}

#[sqlx::test]
async fn test_insert_is_idempotent_by_event_key(pool: PgPool) {
    let link = create_link(&pool, "promo1").await;
    let repo = PgClickRepository::new(Arc::new(pool));

    let new_event = PendingClick::new(&link, DeviceType::Ios, false, None, None, None).to_new_event();
    let first = repo.insert(new_event.clone()).await.unwrap();
    let second = repo.insert(new_event).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.event_key, second.event_key);

    let today = Utc::now().date_naive();
    assert_eq!(repo.count_for_link(link.id, today, today).await.unwrap(), 1);
}

#[sqlx::test]
async fn test_count_for_link_respects_range(pool: PgPool) {
    let link = create_link(&pool, "promo1").await;
    let other = create_link(&pool, "other").await;
    let repo = PgClickRepository::new(Arc::new(pool));

    let today = Utc::now().date_naive();
    let base = PendingClick::new(&link, DeviceType::Other, true, None, None, None);

    for days_ago in [0, 0, 1, 5] {
        let mut event = base.to_new_event();
        event.created_at = Utc::now() - Duration::days(days_ago);
        repo.insert(event).await.unwrap();
    }
    let foreign = PendingClick::new(&other, DeviceType::Other, false, None, None, None);
    repo.insert(foreign.to_new_event()).await.unwrap();

    assert_eq!(repo.count_for_link(link.id, today, today).await.unwrap(), 2);
    assert_eq!(
        repo.count_for_link(link.id, today - Duration::days(1), today)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        repo.count_for_link(link.id, today - Duration::days(30), today)
            .await
            .unwrap(),
        4
    );
}

#[sqlx::test]
async fn test_distinct_keys_are_distinct_rows(pool: PgPool) {
    let link = create_link(&pool, "promo1").await;
    let repo = PgClickRepository::new(Arc::new(pool));

    let mut a = PendingClick::new(&link, DeviceType::Other, false, None, None, None).to_new_event();
    let mut b = a.clone();
    a.event_key = generate_event_key();
    b.event_key = generate_event_key();

    let a = repo.insert(a).await.unwrap();
    let b = repo.insert(b).await.unwrap();

    assert_ne!(a.id, b.id);
}
