// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion of operator replies pushed by the channel provider.
//!
//! The provider redelivers anything it did not see acknowledged, so the
//! ingestor acknowledges as much as it can: unparseable bodies, foreign
//! chats and repeated update ids are all successful no-ops. Only unknown
//! or unauthenticated callers are rejected. Store failures are logged and
//! the call is still acknowledged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use subtle::ConstantTimeEq;
use switchboard_core::{
    ChannelConfig, ChannelDirectory, Direction, FanoutBridge, FanoutPayload, NewMessage,
    StorageAdapter,
};
use switchboard_prometheus::{DeliveryMetrics, WebhookOutcome};
use teloxide::types::{Message, Update, UpdateKind};
use tracing::{debug, error, info, warn};

use crate::policy::best_effort;

/// Result of one webhook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored and published, or acknowledged despite a store failure.
    Accepted,
    /// The update id was already processed.
    Duplicate,
    /// Malformed or not an operator message; acknowledged and dropped.
    Ignored,
    /// No channel uses this webhook secret.
    NotFound,
    /// The header secret is missing or wrong.
    Unauthorized,
}

impl IngestOutcome {
    pub fn metric(self) -> WebhookOutcome {
        match self {
            Self::Accepted => WebhookOutcome::Accepted,
            Self::Duplicate => WebhookOutcome::Duplicate,
            Self::Ignored => WebhookOutcome::Ignored,
            Self::NotFound => WebhookOutcome::NotFound,
            Self::Unauthorized => WebhookOutcome::Unauthorized,
        }
    }
}

pub struct WebhookIngestor {
    directory: Arc<dyn ChannelDirectory>,
    storage: Arc<dyn StorageAdapter>,
    bridge: Arc<dyn FanoutBridge>,
    metrics: Arc<DeliveryMetrics>,
    dedup_ttl: Duration,
}

impl WebhookIngestor {
    pub fn new(
        directory: Arc<dyn ChannelDirectory>,
        storage: Arc<dyn StorageAdapter>,
        bridge: Arc<dyn FanoutBridge>,
        metrics: Arc<DeliveryMetrics>,
        dedup_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            storage,
            bridge,
            metrics,
            dedup_ttl,
        }
    }

    /// Handles one webhook call for the channel identified by `path_secret`.
    pub async fn ingest(
        &self,
        path_secret: &str,
        header_secret: Option<&str>,
        body: &[u8],
    ) -> IngestOutcome {
        let outcome = self.process(path_secret, header_secret, body).await;
        self.metrics.webhook(outcome.metric());
        outcome
    }

    async fn process(
        &self,
        path_secret: &str,
        header_secret: Option<&str>,
        body: &[u8],
    ) -> IngestOutcome {
        let channel = match self.directory.by_webhook_secret(path_secret).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                debug!("webhook secret matches no channel");
                return IngestOutcome::NotFound;
            }
            Err(e) => {
                error!(error = %e, "channel lookup failed, acknowledging");
                return IngestOutcome::Accepted;
            }
        };

        if let Some(expected) = channel.header_secret.as_deref()
            && !header_secret.is_some_and(|provided| secrets_match(expected, provided))
        {
            warn!(tenant_id = %channel.tenant_id, "webhook header secret mismatch");
            return IngestOutcome::Unauthorized;
        }

        let update: Update = match serde_json::from_slice(body) {
            Ok(update) => update,
            Err(e) => {
                debug!(tenant_id = %channel.tenant_id, error = %e, "ignoring malformed update");
                return IngestOutcome::Ignored;
            }
        };
        let update_id = update.id.0;

        match self
            .storage
            .mark_event_if_absent(
                &channel.tenant_id,
                &update_id.to_string(),
                self.dedup_ttl,
                Utc::now(),
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(tenant_id = %channel.tenant_id, update_id, "duplicate update");
                return IngestOutcome::Duplicate;
            }
            Err(e) => {
                error!(
                    tenant_id = %channel.tenant_id,
                    update_id,
                    error = %e,
                    "dedup marker failed, processing without it"
                );
            }
        }

        let UpdateKind::Message(message) = &update.kind else {
            return IngestOutcome::Ignored;
        };
        if message.chat.id.0.to_string() != channel.destination_id {
            debug!(tenant_id = %channel.tenant_id, chat_id = message.chat.id.0, "update from foreign chat");
            return IngestOutcome::Ignored;
        }
        let Some(text) = body_text(message) else {
            return IngestOutcome::Ignored;
        };
        let thread_id = message.thread_id.map(|thread| i64::from(thread.0.0));

        self.deliver(&channel, thread_id, text).await;
        IngestOutcome::Accepted
    }

    /// Stores the operator reply and pushes it to live viewers.
    async fn deliver(&self, channel: &ChannelConfig, thread_id: Option<i64>, text: &str) {
        let tenant_id = channel.tenant_id.as_str();
        let resolved = match thread_id {
            Some(thread_id) => {
                best_effort(
                    "resolve_thread_conversation",
                    self.storage.find_or_create_by_thread(
                        tenant_id,
                        thread_id,
                        &format!("thread-{thread_id}"),
                    ),
                )
                .await
            }
            None => {
                best_effort(
                    "resolve_root_conversation",
                    self.storage.find_or_create_root(tenant_id),
                )
                .await
            }
        };
        let Some(conversation) = resolved else {
            return;
        };

        let stored = best_effort(
            "store_operator_message",
            self.storage.insert_message(NewMessage {
                tenant_id: tenant_id.to_string(),
                conversation_id: conversation.id.clone(),
                direction: Direction::Outbound,
                text: text.to_string(),
            }),
        )
        .await;
        let Some(message) = stored else {
            return;
        };

        best_effort(
            "touch_operator_activity",
            self.storage
                .touch_operator_activity(&conversation.id, message.created_at),
        )
        .await;

        self.bridge
            .publish(
                &conversation.id,
                &FanoutPayload {
                    direction: Direction::Outbound,
                    text: text.to_string(),
                },
            )
            .await;
        info!(
            tenant_id,
            conversation_id = %conversation.id,
            message_id = %message.id,
            "operator reply ingested"
        );
    }
}

/// Text body, falling back to a media caption.
fn body_text(message: &Message) -> Option<&str> {
    message
        .text()
        .or_else(|| message.caption())
        .filter(|text| !text.is_empty())
}

/// Compares secrets without leaking the matching prefix length.
fn secrets_match(expected: &str, provided: &str) -> bool {
    expected.len() == provided.len() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}
