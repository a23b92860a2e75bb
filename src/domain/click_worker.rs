//! Background persistence of clicks queued by the redirect handler.
//!
//! The redirect path never touches the store for writes; it hands a
//! [`PendingClick`] to a bounded channel and returns. [`run_click_worker`]
//! drains that channel and feeds each click through a [`ClickRecorder`]:
//!
//! 1. Insert the raw [`ClickEvent`](crate::domain::entities::ClickEvent),
//!    retried with exponential backoff. Every attempt reuses the same
//!    `event_key`, so a retry after an ambiguous timeout cannot duplicate it.
//! 2. Apply the daily rollup increment, once. A timed-out upsert may already
//!    have committed, so it is logged rather than repeated; `admin metrics
//!    rebuild` recomputes the day from raw events.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::entities::{ClickEvent, DailyMetric, MetricIncrement, NewClickEvent};
use crate::domain::pending_click::PendingClick;
use crate::domain::repositories::{ClickRepository, MetricsRepository};
use crate::error::AppError;

/// First backoff delay is `2 * 25ms`, doubling per attempt.
const BACKOFF_BASE: u64 = 2;
const BACKOFF_FACTOR: u64 = 25;
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Which write on the recording path failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStage {
    ClickEvent,
    DailyMetric,
}

impl RecordingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStage::ClickEvent => "click_event",
            RecordingStage::DailyMetric => "daily_metric",
        }
    }
}

impl std::fmt::Display for RecordingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("{stage} write timed out after {}ms", .after.as_millis())]
    Timeout { stage: RecordingStage, after: Duration },

    #[error("{stage} write failed: {source}")]
    Store {
        stage: RecordingStage,
        #[source]
        source: AppError,
    },
}

impl RecordingError {
    pub fn stage(&self) -> RecordingStage {
        match self {
            RecordingError::Timeout { stage, .. } | RecordingError::Store { stage, .. } => *stage,
        }
    }

    /// Timeouts and internal store errors may succeed on another attempt;
    /// constraint and validation failures will not.
    pub fn is_transient(&self) -> bool {
        match self {
            RecordingError::Timeout { .. } => true,
            RecordingError::Store { source, .. } => matches!(source, AppError::Internal { .. }),
        }
    }
}

/// Persists one click: raw event first, then the daily rollup.
pub struct ClickRecorder {
    clicks: Arc<dyn ClickRepository>,
    metrics: Arc<dyn MetricsRepository>,
    timeout: Duration,
    max_retries: usize,
}

impl ClickRecorder {
    /// `timeout` bounds every single store call; `max_retries` is the number
    /// of extra attempts for the event insert.
    pub fn new(
        clicks: Arc<dyn ClickRepository>,
        metrics: Arc<dyn MetricsRepository>,
        timeout: Duration,
        max_retries: usize,
    ) -> Self {
        Self {
            clicks,
            metrics,
            timeout,
            max_retries,
        }
    }

    /// Records `click` and returns the updated rollup for its day.
    ///
    /// The metrics increment is only applied once the event is durable.
    ///
    /// # Errors
    ///
    /// Returns the [`RecordingError`] of the stage that gave up. When the
    /// event insert fails the rollup is left untouched.
    pub async fn record(&self, click: PendingClick) -> Result<DailyMetric, RecordingError> {
        let event = self.insert_event(click.to_new_event()).await?;

        let date = event.created_at.date_naive();
        let increment = MetricIncrement::for_click(event.is_bot, event.ip.as_deref());

        bounded(
            RecordingStage::DailyMetric,
            self.timeout,
            self.metrics
                .upsert_daily(event.tracked_link_id, date, increment),
        )
        .await
    }

    async fn insert_event(&self, new_event: NewClickEvent) -> Result<ClickEvent, RecordingError> {
        let strategy = ExponentialBackoff::from_millis(BACKOFF_BASE)
            .factor(BACKOFF_FACTOR)
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.max_retries);

        let mut attempt = 0u32;

        RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                let current = attempt;
                let clicks = Arc::clone(&self.clicks);
                let new_event = new_event.clone();
                let timeout = self.timeout;

                async move {
                    let result =
                        bounded(RecordingStage::ClickEvent, timeout, clicks.insert(new_event))
                            .await;

                    if let Err(e) = &result {
                        warn!(attempt = current, error = %e, "Click event insert failed");
                    }

                    result
                }
            },
            RecordingError::is_transient,
        )
        .await
    }
}

async fn bounded<T>(
    stage: RecordingStage,
    limit: Duration,
    operation: impl Future<Output = Result<T, AppError>>,
) -> Result<T, RecordingError> {
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RecordingError::Store { stage, source }),
        Err(_) => Err(RecordingError::Timeout {
            stage,
            after: limit,
        }),
    }
}

/// Consumes queued clicks until every sender is dropped.
///
/// At most `concurrency` clicks are in flight at once. When the channel
/// closes, the worker waits for in-flight clicks before returning, so
/// awaiting its handle on shutdown drains the queue.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<PendingClick>,
    recorder: Arc<ClickRecorder>,
    concurrency: usize,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    info!(concurrency, "Click worker started");

    while let Some(click) = rx.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        while in_flight.try_join_next().is_some() {}

        let recorder = Arc::clone(&recorder);
        in_flight.spawn(async move {
            let _permit = permit;
            process_click(&recorder, click).await;
        });
    }

    while in_flight.join_next().await.is_some() {}

    info!("Click worker stopped, queue drained");
}

async fn process_click(recorder: &ClickRecorder, click: PendingClick) {
    let tracked_link_id = click.tracked_link_id;

    match recorder.record(click).await {
        Ok(metric) => {
            metrics::counter!("link_tracker_clicks_recorded_total").increment(1);
            debug!(
                tracked_link_id,
                date = %metric.date,
                clicks = metric.clicks,
                "Click recorded"
            );
        }
        Err(e) => {
            metrics::counter!(
                "link_tracker_click_recording_failures_total",
                "stage" => e.stage().as_str()
            )
            .increment(1);
            error!(tracked_link_id, stage = %e.stage(), error = %e, "Click recording failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DeviceType;
    use crate::domain::entities::TrackedLink;
    use crate::domain::repositories::{MockClickRepository, MockMetricsRepository};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pending(is_bot: bool) -> PendingClick {
        let link = TrackedLink::single(7, "promo1", "https://example.com");
        PendingClick::new(
            &link,
            DeviceType::Android,
            is_bot,
            Some("203.0.113.7".to_string()),
            Some("Mozilla/5.0 (Linux; Android 14)"),
            None,
        )
    }

    fn metric(clicks: i64, valid_clicks: i64) -> DailyMetric {
        DailyMetric {
            tracked_link_id: 7,
            date: Utc::now().date_naive(),
            clicks,
            valid_clicks,
            uniques: 1,
            updated_at: Utc::now(),
        }
    }

    fn recorder(
        clicks: impl ClickRepository + 'static,
        metrics: impl MetricsRepository + 'static,
        max_retries: usize,
    ) -> ClickRecorder {
        ClickRecorder::new(
            Arc::new(clicks),
            Arc::new(metrics),
            Duration::from_millis(100),
            max_retries,
        )
    }

    #[tokio::test]
    async fn test_record_inserts_event_then_upserts_metric() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert()
            .times(1)
            .returning(|e| Ok(e.into_event(1)));

        let mut metrics = MockMetricsRepository::new();
        metrics
            .expect_upsert_daily()
            .withf(|id, _, inc| *id == 7 && inc.clicks == 1 && inc.valid_clicks == 1)
            .times(1)
            .returning(|_, _, _| Ok(metric(1, 1)));

        let result = recorder(clicks, metrics, 3).record(pending(false)).await;

        assert_eq!(result.unwrap().valid_clicks, 1);
    }

    #[tokio::test]
    async fn test_bot_click_counts_but_is_not_valid() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert()
            .withf(|e| e.is_bot)
            .returning(|e| Ok(e.into_event(1)));

        let mut metrics = MockMetricsRepository::new();
        metrics
            .expect_upsert_daily()
            .withf(|_, _, inc| inc.clicks == 1 && inc.valid_clicks == 0)
            .times(1)
            .returning(|_, _, _| Ok(metric(1, 0)));

        assert!(recorder(clicks, metrics, 0).record(pending(true)).await.is_ok());
    }

    #[tokio::test]
    async fn test_metric_date_follows_click_time() {
        let click = pending(false);
        let expected: NaiveDate = click.clicked_at.date_naive();

        let mut clicks = MockClickRepository::new();
        clicks.expect_insert().returning(|e| Ok(e.into_event(1)));

        let mut metrics = MockMetricsRepository::new();
        metrics
            .expect_upsert_daily()
            .withf(move |_, date, _| *date == expected)
            .times(1)
            .returning(|_, _, _| Ok(metric(1, 1)));

        assert!(recorder(clicks, metrics, 0).record(click).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_insert_failure_is_retried_with_same_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_keys = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut clicks = MockClickRepository::new();
        let counter = Arc::clone(&calls);
        let keys = Arc::clone(&seen_keys);
        clicks.expect_insert().times(2).returning(move |e| {
            keys.lock().unwrap().push(e.event_key.clone());
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::internal("Database error", json!({})))
            } else {
                Ok(e.into_event(1))
            }
        });

        let mut metrics = MockMetricsRepository::new();
        metrics
            .expect_upsert_daily()
            .times(1)
            .returning(|_, _, _| Ok(metric(1, 1)));

        let result = recorder(clicks, metrics, 3).record(pending(false)).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let keys = seen_keys.lock().unwrap();
        assert_eq!(keys[0], keys[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_gives_up_after_max_retries() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert()
            .times(3)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let mut metrics = MockMetricsRepository::new();
        metrics.expect_upsert_daily().never();

        let err = recorder(clicks, metrics, 2)
            .record(pending(false))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), RecordingStage::ClickEvent);
        assert!(matches!(err, RecordingError::Store { .. }));
    }

    #[tokio::test]
    async fn test_permanent_insert_failure_is_not_retried() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert()
            .times(1)
            .returning(|_| Err(AppError::conflict("Unique constraint violation", json!({}))));

        let mut metrics = MockMetricsRepository::new();
        metrics.expect_upsert_daily().never();

        let err = recorder(clicks, metrics, 5)
            .record(pending(false))
            .await
            .unwrap_err();

        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_metric_failure_is_not_retried() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert()
            .times(1)
            .returning(|e| Ok(e.into_event(1)));

        let mut metrics = MockMetricsRepository::new();
        metrics
            .expect_upsert_daily()
            .times(1)
            .returning(|_, _, _| Err(AppError::internal("Database error", json!({}))));

        let err = recorder(clicks, metrics, 3)
            .record(pending(false))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), RecordingStage::DailyMetric);
    }

    struct SlowClicks;

    #[async_trait]
    impl ClickRepository for SlowClicks {
        async fn insert(&self, new_event: NewClickEvent) -> Result<ClickEvent, AppError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(new_event.into_event(1))
        }

        async fn count_for_link(
            &self,
            _tracked_link_id: i64,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<i64, AppError> {
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let mut metrics = MockMetricsRepository::new();
        metrics.expect_upsert_daily().never();

        let err = recorder(SlowClicks, metrics, 1)
            .record(pending(false))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RecordingError::Timeout {
                stage: RecordingStage::ClickEvent,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_worker_drains_queue_on_close() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert()
            .times(5)
            .returning(|e| Ok(e.into_event(1)));

        let mut metrics = MockMetricsRepository::new();
        metrics
            .expect_upsert_daily()
            .times(5)
            .returning(|_, _, _| Ok(metric(1, 1)));

        let (tx, rx) = mpsc::channel(16);
        for _ in 0..5 {
            tx.try_send(pending(false)).unwrap();
        }
        drop(tx);

        run_click_worker(rx, Arc::new(recorder(clicks, metrics, 0)), 2).await;
    }
}
