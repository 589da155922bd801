// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for Switchboard.
//!
//! Implements [`ChannelAdapter`] over the Bot API: plain sends into the
//! operator group, sends into a forum topic, and forum topic creation.
//! The adapter holds no per-tenant state; credentials arrive with every
//! call and a teloxide `Bot` is derived for the token.

pub mod client;

use async_trait::async_trait;
use switchboard_core::{
    AdapterType, ChannelAdapter, ChannelConfig, HealthStatus, PluginAdapter, SwitchboardError,
};
use teloxide::payloads::SendMessageSetters;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, MessageId, Recipient, ThreadId};
use tracing::{debug, info};

pub use client::TelegramClient;

const SEND_MESSAGE: &str = "sendMessage";
const CREATE_FORUM_TOPIC: &str = "createForumTopic";

/// Numeric chat id when the destination parses as one, else an `@channelusername`.
fn recipient(destination: &str) -> Recipient {
    match destination.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(destination.to_string()),
    }
}

fn thread(thread_id: i64) -> Result<ThreadId, SwitchboardError> {
    i32::try_from(thread_id)
        .map(|id| ThreadId(MessageId(id)))
        .map_err(|_| SwitchboardError::channel(format!("thread id {thread_id} out of range")))
}

/// First `limit` characters of `name`.
fn topic_name(name: &str, limit: usize) -> &str {
    match name.char_indices().nth(limit) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

#[async_trait]
impl PluginAdapter for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        // Tokens are per tenant, so there is no single bot to ping.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        debug!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramClient {
    async fn send_text(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        let token = credentials.bot_token.as_str();
        let request = self.bot(token).send_message(recipient(destination), text);
        self.call(SEND_MESSAGE, token, request).await?;
        debug!(tenant_id = %credentials.tenant_id, "message sent");
        Ok(())
    }

    async fn send_text_in_thread(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        thread_id: i64,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        let token = credentials.bot_token.as_str();
        let request = self
            .bot(token)
            .send_message(recipient(destination), text)
            .message_thread_id(thread(thread_id)?);
        self.call(SEND_MESSAGE, token, request).await?;
        debug!(tenant_id = %credentials.tenant_id, thread_id, "message sent to thread");
        Ok(())
    }

    async fn create_thread(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        name: &str,
    ) -> Result<i64, SwitchboardError> {
        let token = credentials.bot_token.as_str();
        let request = self
            .bot(token)
            .create_forum_topic(recipient(destination), topic_name(name, self.topic_name_limit));
        let topic = self.call(CREATE_FORUM_TOPIC, token, request).await?;
        let thread_id = i64::from(topic.thread_id.0.0);
        info!(tenant_id = %credentials.tenant_id, thread_id, "forum topic created");
        Ok(thread_id)
    }
}
