// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery metrics: an explicitly constructed registry object passed to
//! the channel client, outbox worker, webhook ingestor, and fanout bridge.
//!
//! Every increment updates a local atomic (readable through
//! [`DeliveryMetrics::snapshot`]) and the metrics-rs facade, so whichever
//! recorder is installed (Prometheus in production, none in tests) also
//! sees it.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::describe_counter;

pub const CHANNEL_SENDS_TOTAL: &str = "switchboard_channel_sends_total";
pub const CHANNEL_ERRORS_TOTAL: &str = "switchboard_channel_errors_total";
pub const OUTBOX_DELIVERED_TOTAL: &str = "switchboard_outbox_delivered_total";
pub const OUTBOX_FAILED_TOTAL: &str = "switchboard_outbox_failed_total";
pub const OUTBOX_DEAD_TOTAL: &str = "switchboard_outbox_dead_total";
pub const WEBHOOK_UPDATES_TOTAL: &str = "switchboard_webhook_updates_total";
pub const FANOUT_PUBLISHED_TOTAL: &str = "switchboard_fanout_published_total";
pub const FANOUT_BRIDGE_ERRORS_TOTAL: &str = "switchboard_fanout_bridge_errors_total";

/// Register all Switchboard metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(CHANNEL_SENDS_TOTAL, "Channel API call attempts, by method");
    describe_counter!(CHANNEL_ERRORS_TOTAL, "Failed channel API call attempts, by method");
    describe_counter!(OUTBOX_DELIVERED_TOTAL, "Outbox items marked DONE");
    describe_counter!(OUTBOX_FAILED_TOTAL, "Outbox dispatch failures scheduled for retry");
    describe_counter!(OUTBOX_DEAD_TOTAL, "Outbox items parked after exhausting attempts");
    describe_counter!(WEBHOOK_UPDATES_TOTAL, "Inbound webhook updates, by outcome");
    describe_counter!(FANOUT_PUBLISHED_TOTAL, "Payloads published to live viewers");
    describe_counter!(
        FANOUT_BRIDGE_ERRORS_TOTAL,
        "Shared broadcast publishes that fell back to local delivery"
    );
}

/// Webhook outcome label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Accepted,
    Duplicate,
    Ignored,
    NotFound,
    Unauthorized,
}

impl WebhookOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub channel_sends: u64,
    pub channel_errors: u64,
    pub outbox_delivered: u64,
    pub outbox_failed: u64,
    pub outbox_dead: u64,
    pub webhook_accepted: u64,
    pub webhook_duplicates: u64,
    pub webhook_ignored: u64,
    pub webhook_rejected: u64,
    pub fanout_published: u64,
    pub fanout_bridge_errors: u64,
}

/// Delivery counters.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    channel_sends: AtomicU64,
    channel_errors: AtomicU64,
    outbox_delivered: AtomicU64,
    outbox_failed: AtomicU64,
    outbox_dead: AtomicU64,
    webhook_accepted: AtomicU64,
    webhook_duplicates: AtomicU64,
    webhook_ignored: AtomicU64,
    webhook_rejected: AtomicU64,
    fanout_published: AtomicU64,
    fanout_bridge_errors: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One channel API attempt.
    pub fn channel_send(&self, method: &'static str) {
        bump(&self.channel_sends);
        metrics::counter!(CHANNEL_SENDS_TOTAL, "method" => method).increment(1);
    }

    /// One failed channel API attempt.
    pub fn channel_error(&self, method: &'static str) {
        bump(&self.channel_errors);
        metrics::counter!(CHANNEL_ERRORS_TOTAL, "method" => method).increment(1);
    }

    pub fn outbox_delivered(&self) {
        bump(&self.outbox_delivered);
        metrics::counter!(OUTBOX_DELIVERED_TOTAL).increment(1);
    }

    pub fn outbox_failed(&self) {
        bump(&self.outbox_failed);
        metrics::counter!(OUTBOX_FAILED_TOTAL).increment(1);
    }

    pub fn outbox_dead(&self) {
        bump(&self.outbox_dead);
        metrics::counter!(OUTBOX_DEAD_TOTAL).increment(1);
    }

    pub fn webhook(&self, outcome: WebhookOutcome) {
        let counter = match outcome {
            WebhookOutcome::Accepted => &self.webhook_accepted,
            WebhookOutcome::Duplicate => &self.webhook_duplicates,
            WebhookOutcome::Ignored => &self.webhook_ignored,
            WebhookOutcome::NotFound | WebhookOutcome::Unauthorized => &self.webhook_rejected,
        };
        bump(counter);
        metrics::counter!(WEBHOOK_UPDATES_TOTAL, "outcome" => outcome.as_str()).increment(1);
    }

    pub fn fanout_published(&self) {
        bump(&self.fanout_published);
        metrics::counter!(FANOUT_PUBLISHED_TOTAL).increment(1);
    }

    pub fn fanout_bridge_error(&self) {
        bump(&self.fanout_bridge_errors);
        metrics::counter!(FANOUT_BRIDGE_ERRORS_TOTAL).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            channel_sends: get(&self.channel_sends),
            channel_errors: get(&self.channel_errors),
            outbox_delivered: get(&self.outbox_delivered),
            outbox_failed: get(&self.outbox_failed),
            outbox_dead: get(&self.outbox_dead),
            webhook_accepted: get(&self.webhook_accepted),
            webhook_duplicates: get(&self.webhook_duplicates),
            webhook_ignored: get(&self.webhook_ignored),
            webhook_rejected: get(&self.webhook_rejected),
            fanout_published: get(&self.fanout_published),
            fanout_bridge_errors: get(&self.fanout_bridge_errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_work_without_recorder() {
        let metrics = DeliveryMetrics::new();
        metrics.channel_send("sendMessage");
        metrics.channel_send("sendMessage");
        metrics.channel_error("sendMessage");
        metrics.outbox_delivered();
        metrics.webhook(WebhookOutcome::Duplicate);
        metrics.webhook(WebhookOutcome::Unauthorized);
        metrics.webhook(WebhookOutcome::NotFound);

        let snap = metrics.snapshot();
        assert_eq!(snap.channel_sends, 2);
        assert_eq!(snap.channel_errors, 1);
        assert_eq!(snap.outbox_delivered, 1);
        assert_eq!(snap.webhook_duplicates, 1);
        assert_eq!(snap.webhook_rejected, 2);
        assert_eq!(snap.webhook_accepted, 0);
    }

    #[test]
    fn register_metrics_without_recorder_is_noop() {
        register_metrics();
    }

    #[test]
    fn outcome_labels_are_snake_case() {
        assert_eq!(WebhookOutcome::NotFound.as_str(), "not_found");
        assert_eq!(WebhookOutcome::Accepted.as_str(), "accepted");
    }
}
