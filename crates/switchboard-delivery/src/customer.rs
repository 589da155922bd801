// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer-originated messages: store, fan out, and deliver to operators.

use std::sync::Arc;

use switchboard_core::{
    ChannelAdapter, ChannelConfig, ChannelDirectory, ChannelSendPayload, Direction, FanoutBridge,
    FanoutPayload, Message, NewMessage, NewOutboxItem, StorageAdapter, SwitchboardError,
};
use tracing::{debug, info, warn};

use crate::policy::best_effort;
use crate::threads::ThreadResolver;

/// How a customer message reached (or will reach) the operator channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Delivered inline.
    Sent,
    /// Persisted as an outbox item for the worker.
    Queued { outbox_id: String },
    /// The tenant has no channel configured; stored only.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub thread_id: Option<i64>,
    pub delivery: DeliveryState,
}

pub struct CustomerMessages {
    storage: Arc<dyn StorageAdapter>,
    directory: Arc<dyn ChannelDirectory>,
    channel: Arc<dyn ChannelAdapter>,
    bridge: Arc<dyn FanoutBridge>,
    resolver: Arc<ThreadResolver>,
    inline_send: bool,
}

impl CustomerMessages {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        directory: Arc<dyn ChannelDirectory>,
        channel: Arc<dyn ChannelAdapter>,
        bridge: Arc<dyn FanoutBridge>,
        resolver: Arc<ThreadResolver>,
        inline_send: bool,
    ) -> Self {
        Self {
            storage,
            directory,
            channel,
            bridge,
            resolver,
            inline_send,
        }
    }

    /// Records a customer message and hands it to the operator channel.
    ///
    /// Fails only when the conversation does not belong to the tenant or
    /// the store is unavailable; a failed channel lookup stores nothing.
    /// An unreachable channel degrades to an outbox item.
    pub async fn send(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        text: &str,
        idempotency_key: Option<String>,
    ) -> Result<SentMessage, SwitchboardError> {
        match self.storage.get_conversation(conversation_id).await? {
            Some(conversation) if conversation.tenant_id == tenant_id => {}
            _ => {
                return Err(SwitchboardError::NotFound(format!(
                    "conversation {conversation_id}"
                )));
            }
        }
        let channel = self.directory.for_tenant(tenant_id).await?;

        let message = self
            .storage
            .insert_message(NewMessage {
                tenant_id: tenant_id.to_string(),
                conversation_id: conversation_id.to_string(),
                direction: Direction::Inbound,
                text: text.to_string(),
            })
            .await?;
        best_effort(
            "touch_customer_activity",
            self.storage
                .touch_customer_activity(conversation_id, message.created_at),
        )
        .await;

        self.bridge
            .publish(
                conversation_id,
                &FanoutPayload {
                    direction: Direction::Inbound,
                    text: text.to_string(),
                },
            )
            .await;

        let thread_id = self.resolver.ensure_thread(tenant_id, conversation_id).await;
        let Some(channel) = channel else {
            debug!(tenant_id, conversation_id, "no channel configured, delivery skipped");
            return Ok(SentMessage {
                message,
                thread_id,
                delivery: DeliveryState::Skipped,
            });
        };

        let payload = ChannelSendPayload {
            destination: channel.destination_id.clone(),
            text: text.to_string(),
            thread_id,
        };

        if self.inline_send {
            match self.send_inline(&channel, &payload).await {
                Ok(()) => {
                    info!(tenant_id, conversation_id, message_id = %message.id, "customer message delivered inline");
                    return Ok(SentMessage {
                        message,
                        thread_id,
                        delivery: DeliveryState::Sent,
                    });
                }
                Err(e) => {
                    warn!(
                        tenant_id,
                        conversation_id,
                        message_id = %message.id,
                        error = %e,
                        "inline send failed, queueing for retry"
                    );
                }
            }
        }

        let key = idempotency_key.unwrap_or_else(|| format!("msg:{}", message.id));
        let item = self
            .storage
            .enqueue(NewOutboxItem::channel_send(tenant_id, &payload, Some(key))?)
            .await?;
        info!(tenant_id, conversation_id, outbox_id = %item.id, "customer message queued");
        Ok(SentMessage {
            message,
            thread_id,
            delivery: DeliveryState::Queued { outbox_id: item.id },
        })
    }

    async fn send_inline(
        &self,
        channel: &ChannelConfig,
        payload: &ChannelSendPayload,
    ) -> Result<(), SwitchboardError> {
        match payload.thread_id {
            Some(thread_id) => {
                self.channel
                    .send_text_in_thread(channel, &payload.destination, thread_id, &payload.text)
                    .await
            }
            None => {
                self.channel
                    .send_text(channel, &payload.destination, &payload.text)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use switchboard_core::{CHANNEL_SEND, OutboxStatus};
    use switchboard_fanout::Connection;
    use switchboard_test_utils::{SAMPLE_GROUP_ID, TestHarness, sample_channel};

    struct UnreachableDirectory;

    #[async_trait]
    impl ChannelDirectory for UnreachableDirectory {
        async fn by_webhook_secret(
            &self,
            _secret: &str,
        ) -> Result<Option<ChannelConfig>, SwitchboardError> {
            Err(SwitchboardError::Internal("directory offline".into()))
        }

        async fn for_tenant(&self, _tenant_id: &str) -> Result<Option<ChannelConfig>, SwitchboardError> {
            Err(SwitchboardError::Internal("directory offline".into()))
        }
    }

    fn service(harness: &TestHarness, inline_send: bool) -> CustomerMessages {
        let resolver = Arc::new(ThreadResolver::new(
            harness.storage.clone(),
            harness.storage.clone(),
            harness.channel.clone(),
            harness.config.telegram.topic_name_limit,
        ));
        CustomerMessages::new(
            harness.storage.clone(),
            harness.storage.clone(),
            harness.channel.clone(),
            harness.bridge.clone(),
            resolver,
            inline_send,
        )
    }

    async fn configured() -> TestHarness {
        TestHarness::builder()
            .with_channel(sample_channel("t1"))
            .with_thread_id(42)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn inline_send_delivers_into_new_thread() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t1", "amber-fox").await.unwrap();
        let (viewer, mut rx) = Connection::new(8);
        harness.hub.register(&conv.id, viewer);

        let sent = service(&harness, true)
            .send("t1", &conv.id, "hello", None)
            .await
            .unwrap();

        assert_eq!(sent.delivery, DeliveryState::Sent);
        assert_eq!(sent.thread_id, Some(42));
        assert_eq!(sent.message.direction, Direction::Inbound);

        let delivered = harness.channel.sent_messages().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].thread_id, Some(42));
        assert_eq!(delivered[0].destination, SAMPLE_GROUP_ID.to_string());
        assert_eq!(delivered[0].text, "hello");

        let frame: FanoutPayload = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame.direction, Direction::Inbound);

        let stored = harness.storage.get_conversation(&conv.id).await.unwrap().unwrap();
        assert!(stored.last_customer_at.is_some());
        assert_eq!(stored.thread_id, Some(42));
    }

    #[tokio::test]
    async fn failed_inline_send_is_queued_with_message_key() {
        let harness = configured().await;
        harness.channel.fail_sends(1);
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();

        let sent = service(&harness, true)
            .send("t1", &conv.id, "hello", None)
            .await
            .unwrap();

        let DeliveryState::Queued { outbox_id } = &sent.delivery else {
            panic!("expected queued delivery, got {:?}", sent.delivery);
        };
        let item = harness.storage.get_outbox_item(outbox_id).await.unwrap().unwrap();
        assert_eq!(item.kind, CHANNEL_SEND);
        assert_eq!(item.status, OutboxStatus::Pending);
        assert_eq!(item.idempotency_key, Some(format!("msg:{}", sent.message.id)));
        let payload: ChannelSendPayload = serde_json::from_value(item.payload).unwrap();
        assert_eq!(payload.thread_id, Some(42));
        assert_eq!(payload.text, "hello");
    }

    #[tokio::test]
    async fn outbox_only_mode_skips_inline_attempt() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();

        let sent = service(&harness, false)
            .send("t1", &conv.id, "hello", Some("client-1".into()))
            .await
            .unwrap();

        assert!(matches!(sent.delivery, DeliveryState::Queued { .. }));
        assert_eq!(harness.channel.send_attempts(), 0);
        let DeliveryState::Queued { outbox_id } = &sent.delivery else {
            unreachable!()
        };
        let item = harness.storage.get_outbox_item(outbox_id).await.unwrap().unwrap();
        assert_eq!(item.idempotency_key.as_deref(), Some("client-1"));
    }

    #[tokio::test]
    async fn repeated_key_collapses_to_one_outbox_item() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();
        let service = service(&harness, false);

        let first = service.send("t1", &conv.id, "a", Some("k".into())).await.unwrap();
        let second = service.send("t1", &conv.id, "a", Some("k".into())).await.unwrap();
        assert_eq!(first.delivery, second.delivery);
    }

    #[tokio::test]
    async fn without_channel_message_is_stored_only() {
        let harness = TestHarness::builder().build().await.unwrap();
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();

        let sent = service(&harness, true)
            .send("t1", &conv.id, "hello", None)
            .await
            .unwrap();

        assert_eq!(sent.delivery, DeliveryState::Skipped);
        assert_eq!(sent.thread_id, None);
        assert_eq!(harness.channel.send_attempts(), 0);
        let messages = harness.storage.get_messages(&conv.id, None).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn channel_lookup_failure_is_an_error_not_a_skip() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();
        let resolver = Arc::new(ThreadResolver::new(
            harness.storage.clone(),
            Arc::new(UnreachableDirectory),
            harness.channel.clone(),
            128,
        ));
        let service = CustomerMessages::new(
            harness.storage.clone(),
            Arc::new(UnreachableDirectory),
            harness.channel.clone(),
            harness.bridge.clone(),
            resolver,
            true,
        );

        let err = service.send("t1", &conv.id, "hello", None).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::Internal(_)));

        // The lookup runs before the message is stored.
        assert!(harness.storage.get_messages(&conv.id, None).await.unwrap().is_empty());
        assert_eq!(harness.channel.send_attempts(), 0);
    }

    #[tokio::test]
    async fn store_failure_on_enqueue_is_an_error() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();
        harness.drop_table("outbox").await.unwrap();

        let result = service(&harness, false).send("t1", &conv.id, "hello", None).await;
        assert!(matches!(result, Err(SwitchboardError::Storage { .. })));
    }

    #[tokio::test]
    async fn store_failure_on_insert_is_an_error() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t1", "c").await.unwrap();
        harness.drop_table("messages").await.unwrap();

        let result = service(&harness, true).send("t1", &conv.id, "hello", None).await;
        assert!(matches!(result, Err(SwitchboardError::Storage { .. })));
        assert_eq!(harness.channel.send_attempts(), 0);
    }

    #[tokio::test]
    async fn foreign_conversation_is_rejected() {
        let harness = configured().await;
        let conv = harness.storage.create_conversation("t2", "c").await.unwrap();

        let err = service(&harness, true)
            .send("t1", &conv.id, "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::NotFound(_)));
        assert!(harness.storage.get_messages(&conv.id, None).await.unwrap().is_empty());
    }
}
