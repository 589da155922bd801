// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazily binds conversations to operator threads.
//!
//! The first customer message of a conversation creates a forum topic in
//! the tenant's operator group; later messages reuse the stored id. When
//! creation fails the message still lands somewhere: the tenant's default
//! thread, else the general topic. Fallback ids are never persisted, so the
//! next message retries creation.

use std::sync::Arc;

use switchboard_core::{
    ChannelAdapter, ChannelDirectory, ConversationKind, ROOT_THREAD_ID, StorageAdapter,
};
use tracing::{debug, info, warn};

use crate::policy::best_effort;

pub struct ThreadResolver {
    storage: Arc<dyn StorageAdapter>,
    directory: Arc<dyn ChannelDirectory>,
    channel: Arc<dyn ChannelAdapter>,
    topic_name_limit: usize,
}

impl ThreadResolver {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        directory: Arc<dyn ChannelDirectory>,
        channel: Arc<dyn ChannelAdapter>,
        topic_name_limit: usize,
    ) -> Self {
        Self {
            storage,
            directory,
            channel,
            topic_name_limit,
        }
    }

    /// Returns the thread a conversation's messages should be posted to.
    ///
    /// `None` when the conversation is unknown, belongs to another tenant,
    /// or the tenant has no channel configured. Never fails.
    pub async fn ensure_thread(&self, tenant_id: &str, conversation_id: &str) -> Option<i64> {
        let conversation = match self.storage.get_conversation(conversation_id).await {
            Ok(Some(c)) if c.tenant_id == tenant_id => c,
            Ok(_) => {
                debug!(tenant_id, conversation_id, "conversation not found for tenant");
                return None;
            }
            Err(e) => {
                warn!(tenant_id, conversation_id, error = %e, "conversation lookup failed");
                return None;
            }
        };

        if let Some(thread_id) = conversation.thread_id {
            return Some(thread_id);
        }
        if conversation.kind == ConversationKind::Root {
            return Some(ROOT_THREAD_ID);
        }

        let channel = match self.directory.for_tenant(tenant_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                debug!(tenant_id, "no channel configured, thread not resolved");
                return None;
            }
            Err(e) => {
                warn!(tenant_id, error = %e, "channel lookup failed");
                return None;
            }
        };

        let name: String = conversation
            .codename
            .chars()
            .take(self.topic_name_limit)
            .collect();
        match self
            .channel
            .create_thread(&channel, &channel.destination_id, &name)
            .await
        {
            Ok(created) => {
                let stored = best_effort(
                    "persist_thread",
                    self.storage.set_thread_if_unset(conversation_id, created),
                )
                .await
                .flatten();
                match stored {
                    Some(winner) if winner != created => {
                        info!(
                            conversation_id,
                            created, winner, "lost thread creation race, using stored thread"
                        );
                        Some(winner)
                    }
                    _ => {
                        info!(tenant_id, conversation_id, thread_id = created, "thread created");
                        Some(created)
                    }
                }
            }
            Err(e) => {
                let fallback = channel.default_thread_id.unwrap_or(ROOT_THREAD_ID);
                warn!(
                    tenant_id,
                    conversation_id,
                    fallback,
                    error = %e,
                    "thread creation failed, using fallback thread"
                );
                Some(fallback)
            }
        }
    }
}
