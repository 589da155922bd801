// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox worker: claims persisted deliveries and dispatches them.
//!
//! Delivery is at-least-once. An item is claimed under a lease, handed to
//! the handler registered for its kind, and marked DONE on success. Any
//! failure returns it to PENDING with a fixed backoff; with an attempt cap
//! configured, the last failure parks it as DEAD instead. A worker that
//! dies mid-dispatch leaves the lease to expire and another worker reclaims
//! the item.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use switchboard_config::model::OutboxConfig;
use switchboard_core::{
    CHANNEL_SEND, ChannelAdapter, ChannelDirectory, ChannelSendPayload, OutboxItem,
    StorageAdapter, SwitchboardError,
};
use switchboard_prometheus::DeliveryMetrics;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Performs the external side effect of one outbox item kind.
#[async_trait]
pub trait OutboxHandler: Send + Sync {
    async fn handle(&self, item: &OutboxItem) -> Result<(), SwitchboardError>;
}

/// Serves [`CHANNEL_SEND`] items through the tenant's operator channel.
pub struct ChannelSendHandler {
    directory: Arc<dyn ChannelDirectory>,
    channel: Arc<dyn ChannelAdapter>,
}

impl ChannelSendHandler {
    pub fn new(directory: Arc<dyn ChannelDirectory>, channel: Arc<dyn ChannelAdapter>) -> Self {
        Self { directory, channel }
    }
}

#[async_trait]
impl OutboxHandler for ChannelSendHandler {
    async fn handle(&self, item: &OutboxItem) -> Result<(), SwitchboardError> {
        let payload: ChannelSendPayload = serde_json::from_value(item.payload.clone())?;
        let credentials = self
            .directory
            .for_tenant(&item.tenant_id)
            .await?
            .ok_or_else(|| {
                SwitchboardError::NotFound(format!(
                    "channel configuration for tenant {}",
                    item.tenant_id
                ))
            })?;

        match payload.thread_id {
            Some(thread_id) => {
                self.channel
                    .send_text_in_thread(&credentials, &payload.destination, thread_id, &payload.text)
                    .await
            }
            None => {
                self.channel
                    .send_text(&credentials, &payload.destination, &payload.text)
                    .await
            }
        }
    }
}

/// Timing and retry policy for an [`OutboxWorker`].
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub idle_interval: Duration,
    pub retry_backoff: Duration,
    pub lease: Duration,
    pub shutdown_grace: Duration,
    pub max_attempts: Option<u32>,
}

impl From<&OutboxConfig> for WorkerSettings {
    fn from(config: &OutboxConfig) -> Self {
        Self {
            idle_interval: Duration::from_millis(config.idle_interval_ms),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            lease: Duration::from_secs(config.lease_secs),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from(&OutboxConfig::default())
    }
}

/// What a single [`OutboxWorker::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was eligible, or the claim failed.
    Idle,
    Delivered { id: String },
    /// Dispatch failed; the item is PENDING again.
    Retrying { id: String, error: String },
    /// Dispatch failed for the last allowed time.
    Dead { id: String, error: String },
}

pub struct OutboxWorker {
    storage: Arc<dyn StorageAdapter>,
    handlers: HashMap<String, Arc<dyn OutboxHandler>>,
    settings: WorkerSettings,
    metrics: Arc<DeliveryMetrics>,
}

impl OutboxWorker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        settings: WorkerSettings,
        metrics: Arc<DeliveryMetrics>,
    ) -> Self {
        Self {
            storage,
            handlers: HashMap::new(),
            settings,
            metrics,
        }
    }

    /// Registers the handler for items of `kind`, replacing any previous one.
    pub fn with_handler(mut self, kind: impl Into<String>, handler: Arc<dyn OutboxHandler>) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    /// Registers a [`ChannelSendHandler`] for [`CHANNEL_SEND`].
    pub fn with_channel_send(
        self,
        directory: Arc<dyn ChannelDirectory>,
        channel: Arc<dyn ChannelAdapter>,
    ) -> Self {
        self.with_handler(
            CHANNEL_SEND,
            Arc::new(ChannelSendHandler::new(directory, channel)),
        )
    }

    /// Claims and dispatches at most one item.
    ///
    /// `now` is the clock for both the claim and any rescheduling.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let item = match self.storage.claim_next(now, self.settings.lease).await {
            Ok(Some(item)) => item,
            Ok(None) => return TickOutcome::Idle,
            Err(e) => {
                warn!(error = %e, "outbox claim failed, treating as idle");
                return TickOutcome::Idle;
            }
        };

        debug!(id = %item.id, kind = %item.kind, attempts = item.attempts, "outbox item claimed");
        let result = self.dispatch(&item).await;
        self.settle(item, result, now).await
    }

    async fn dispatch(&self, item: &OutboxItem) -> Result<(), SwitchboardError> {
        let handler = self.handlers.get(&item.kind).ok_or_else(|| {
            SwitchboardError::Internal(format!("no handler for outbox item type {}", item.kind))
        })?;
        handler.handle(item).await
    }

    async fn settle(
        &self,
        item: OutboxItem,
        result: Result<(), SwitchboardError>,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        match result {
            Ok(()) => {
                if let Err(e) = self.storage.mark_done(&item.id).await {
                    // The lease will expire and the item be delivered again.
                    error!(id = %item.id, error = %e, "failed to mark outbox item done");
                }
                self.metrics.outbox_delivered();
                info!(id = %item.id, tenant_id = %item.tenant_id, "outbox item delivered");
                TickOutcome::Delivered { id: item.id }
            }
            Err(e) => {
                let error = e.to_string();
                let attempts = item.attempts + 1;
                let exhausted = self
                    .settings
                    .max_attempts
                    .is_some_and(|max| attempts >= max);

                if exhausted {
                    if let Err(e) = self.storage.mark_dead(&item.id, &error).await {
                        error!(id = %item.id, error = %e, "failed to park outbox item");
                    }
                    self.metrics.outbox_dead();
                    warn!(id = %item.id, attempts, error = %error, "outbox item parked as dead");
                    TickOutcome::Dead { id: item.id, error }
                } else {
                    if let Err(e) = self
                        .storage
                        .mark_failed(&item.id, &error, self.settings.retry_backoff, now)
                        .await
                    {
                        error!(id = %item.id, error = %e, "failed to reschedule outbox item");
                    }
                    self.metrics.outbox_failed();
                    warn!(id = %item.id, attempts, error = %error, "outbox dispatch failed, will retry");
                    TickOutcome::Retrying { id: item.id, error }
                }
            }
        }
    }

    /// Runs until `cancel` fires.
    ///
    /// Eligible items are drained back to back; an empty outbox is polled
    /// every idle interval. On cancellation an in-flight dispatch gets the
    /// shutdown grace period to finish, after which it is abandoned to its
    /// lease.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            idle_interval_ms = self.settings.idle_interval.as_millis() as u64,
            "outbox worker running"
        );
        let mut ticker = tokio::time::interval(self.settings.idle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'outer: loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            loop {
                if cancel.is_cancelled() {
                    break 'outer;
                }
                let tick = self.tick(Utc::now());
                tokio::pin!(tick);
                let outcome = tokio::select! {
                    outcome = &mut tick => outcome,
                    _ = cancel.cancelled() => {
                        info!(
                            grace_secs = self.settings.shutdown_grace.as_secs(),
                            "shutdown requested, waiting for in-flight dispatch"
                        );
                        match tokio::time::timeout(self.settings.shutdown_grace, &mut tick).await {
                            Ok(outcome) => outcome,
                            Err(_) => {
                                warn!("in-flight dispatch exceeded shutdown grace, leaving it to its lease");
                                break 'outer;
                            }
                        }
                    }
                };
                if outcome == TickOutcome::Idle {
                    break;
                }
            }
        }

        info!("outbox worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::{NewOutboxItem, OutboxStatus};
    use switchboard_test_utils::{SAMPLE_GROUP_ID, TestHarness, sample_channel};

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    async fn harness() -> TestHarness {
        TestHarness::builder()
            .with_channel(sample_channel("t1"))
            .build()
            .await
            .unwrap()
    }

    fn worker(harness: &TestHarness, settings: WorkerSettings) -> OutboxWorker {
        OutboxWorker::new(harness.storage.clone(), settings, harness.metrics.clone())
            .with_channel_send(harness.storage.clone(), harness.channel.clone())
    }

    fn send_item(tenant: &str, text: &str, thread_id: Option<i64>) -> NewOutboxItem {
        NewOutboxItem::channel_send(
            tenant,
            &ChannelSendPayload {
                destination: SAMPLE_GROUP_ID.to_string(),
                text: text.into(),
                thread_id,
            },
            None,
        )
        .unwrap()
    }

    async fn enqueue(harness: &TestHarness, item: NewOutboxItem) -> OutboxItem {
        harness.storage.enqueue(item).await.unwrap()
    }

    /// Items are stamped with the wall clock; tick far enough ahead.
    fn later() -> DateTime<Utc> {
        Utc::now() + secs(1)
    }

    #[tokio::test]
    async fn delivers_into_thread() {
        let harness = harness().await;
        let item = enqueue(&harness, send_item("t1", "hello", Some(42))).await;
        let worker = worker(&harness, WorkerSettings::default());

        assert_eq!(
            worker.tick(later()).await,
            TickOutcome::Delivered { id: item.id.clone() }
        );
        let sent = harness.channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].thread_id, Some(42));
        assert_eq!(sent[0].text, "hello");
        assert_eq!(sent[0].destination, SAMPLE_GROUP_ID.to_string());

        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Done);
        assert_eq!(worker.tick(later()).await, TickOutcome::Idle);
        assert_eq!(harness.metrics.snapshot().outbox_delivered, 1);
    }

    #[tokio::test]
    async fn delivers_without_thread() {
        let harness = harness().await;
        enqueue(&harness, send_item("t1", "plain", None)).await;

        worker(&harness, WorkerSettings::default()).tick(later()).await;
        assert_eq!(harness.channel.sent_messages().await[0].thread_id, None);
    }

    #[tokio::test]
    async fn failure_retries_after_backoff_then_succeeds() {
        let harness = harness().await;
        let item = enqueue(&harness, send_item("t1", "hello", Some(42))).await;
        harness.channel.fail_sends(1);
        let worker = worker(&harness, WorkerSettings::default());
        let now = later();

        assert!(matches!(worker.tick(now).await, TickOutcome::Retrying { .. }));
        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.attempts, 1);
        assert!(stored.last_error.unwrap().contains("mock send failure"));

        // Backoff not yet elapsed.
        assert_eq!(worker.tick(now + secs(1)).await, TickOutcome::Idle);
        assert_eq!(
            worker.tick(now + secs(3)).await,
            TickOutcome::Delivered { id: item.id.clone() }
        );

        assert_eq!(harness.channel.sent_count().await, 1);
        assert_eq!(harness.channel.send_attempts(), 2);
        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Done);
        assert_eq!(harness.metrics.snapshot().outbox_failed, 1);
    }

    #[tokio::test]
    async fn missing_channel_configuration_is_retried() {
        let harness = harness().await;
        let item = enqueue(&harness, send_item("unknown-tenant", "hi", None)).await;

        let outcome = worker(&harness, WorkerSettings::default()).tick(later()).await;
        assert!(matches!(outcome, TickOutcome::Retrying { .. }));
        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert!(stored.last_error.unwrap().contains("channel configuration"));
        assert_eq!(harness.channel.send_attempts(), 0);
    }

    #[tokio::test]
    async fn unknown_kind_and_bad_payload_are_retried() {
        let harness = harness().await;
        let unknown = enqueue(
            &harness,
            NewOutboxItem {
                tenant_id: "t1".into(),
                kind: "carrier_pigeon".into(),
                payload: serde_json::json!({}),
                idempotency_key: None,
            },
        )
        .await;
        let worker = worker(&harness, WorkerSettings::default());
        let now = later();
        assert!(matches!(worker.tick(now).await, TickOutcome::Retrying { .. }));
        let stored = harness.storage.get_outbox_item(&unknown.id).await.unwrap().unwrap();
        assert!(stored.last_error.unwrap().contains("carrier_pigeon"));

        let bad = enqueue(
            &harness,
            NewOutboxItem {
                tenant_id: "t1".into(),
                kind: CHANNEL_SEND.into(),
                payload: serde_json::json!({"text": 5}),
                idempotency_key: None,
            },
        )
        .await;
        assert!(matches!(worker.tick(now).await, TickOutcome::Retrying { .. }));
        let stored = harness.storage.get_outbox_item(&bad.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
    }

    #[tokio::test]
    async fn attempt_cap_parks_item_as_dead() {
        let harness = harness().await;
        let item = enqueue(&harness, send_item("t1", "hello", None)).await;
        harness.channel.fail_all_sends();
        let settings = WorkerSettings {
            max_attempts: Some(2),
            ..WorkerSettings::default()
        };
        let worker = worker(&harness, settings);
        let now = later();

        assert!(matches!(worker.tick(now).await, TickOutcome::Retrying { .. }));
        assert!(matches!(worker.tick(now + secs(5)).await, TickOutcome::Dead { .. }));
        assert_eq!(worker.tick(now + secs(60)).await, TickOutcome::Idle);

        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Dead);
        assert_eq!(stored.attempts, 2);
        assert_eq!(harness.metrics.snapshot().outbox_dead, 1);
    }

    #[tokio::test]
    async fn attempts_are_unbounded_by_default() {
        let harness = harness().await;
        let item = enqueue(&harness, send_item("t1", "hello", None)).await;
        harness.channel.fail_all_sends();
        let worker = worker(&harness, WorkerSettings::default());
        let mut now = later();

        for _ in 0..5 {
            assert!(matches!(worker.tick(now).await, TickOutcome::Retrying { .. }));
            now += secs(3);
        }
        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.attempts, 5);
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimed() {
        let harness = harness().await;
        let item = enqueue(&harness, send_item("t1", "hello", None)).await;
        let now = later();

        // A worker claims the item and dies without settling it.
        let claimed = harness
            .storage
            .claim_next(now, Duration::from_secs(120))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, item.id);

        let worker = worker(&harness, WorkerSettings::default());
        assert_eq!(worker.tick(now + secs(60)).await, TickOutcome::Idle);
        assert_eq!(
            worker.tick(now + secs(121)).await,
            TickOutcome::Delivered { id: item.id }
        );
    }

    #[tokio::test]
    async fn fifo_among_eligible_items() {
        let harness = harness().await;
        enqueue(&harness, send_item("t1", "first", None)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        enqueue(&harness, send_item("t1", "second", None)).await;
        let worker = worker(&harness, WorkerSettings::default());

        worker.tick(later()).await;
        worker.tick(later()).await;
        let texts: Vec<String> = harness
            .channel
            .sent_messages()
            .await
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(texts, ["first", "second"]);
    }

    struct SlowHandler {
        delay: Duration,
    }

    #[async_trait]
    impl OutboxHandler for SlowHandler {
        async fn handle(&self, _item: &OutboxItem) -> Result<(), SwitchboardError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    fn slow_item() -> NewOutboxItem {
        NewOutboxItem {
            tenant_id: "t1".into(),
            kind: "slow".into(),
            payload: serde_json::json!({}),
            idempotency_key: None,
        }
    }

    fn fast_settings(grace: Duration) -> WorkerSettings {
        WorkerSettings {
            idle_interval: Duration::from_millis(10),
            shutdown_grace: grace,
            ..WorkerSettings::default()
        }
    }

    #[tokio::test]
    async fn run_drains_outbox_and_stops_on_cancel() {
        let harness = harness().await;
        for i in 0..3 {
            enqueue(&harness, send_item("t1", &format!("m{i}"), None)).await;
        }
        let worker = Arc::new(worker(&harness, fast_settings(Duration::from_secs(1))));
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            async move { worker.run(cancel).await }
        });

        for _ in 0..200 {
            if harness.channel.sent_count().await == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(harness.channel.sent_count().await, 3);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn in_flight_dispatch_finishes_within_grace() {
        let harness = harness().await;
        let item = enqueue(&harness, slow_item()).await;
        let worker = Arc::new(
            OutboxWorker::new(
                harness.storage.clone(),
                fast_settings(Duration::from_secs(5)),
                harness.metrics.clone(),
            )
            .with_handler(
                "slow",
                Arc::new(SlowHandler {
                    delay: Duration::from_millis(300),
                }),
            ),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            async move { worker.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Done);
    }

    #[tokio::test]
    async fn dispatch_past_grace_is_left_to_its_lease() {
        let harness = harness().await;
        let item = enqueue(&harness, slow_item()).await;
        let worker = Arc::new(
            OutboxWorker::new(
                harness.storage.clone(),
                fast_settings(Duration::from_millis(50)),
                harness.metrics.clone(),
            )
            .with_handler(
                "slow",
                Arc::new(SlowHandler {
                    delay: Duration::from_secs(30),
                }),
            ),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            async move { worker.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let stored = harness.storage.get_outbox_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Processing);
        assert!(stored.locked_until.is_some());
    }

    #[test]
    fn settings_follow_config() {
        let config = OutboxConfig {
            retry_backoff_ms: 500,
            max_attempts: Some(4),
            ..OutboxConfig::default()
        };
        let settings = WorkerSettings::from(&config);
        assert_eq!(settings.retry_backoff, Duration::from_millis(500));
        assert_eq!(settings.max_attempts, Some(4));
        assert_eq!(WorkerSettings::default().retry_backoff, Duration::from_secs(2));
    }
}
