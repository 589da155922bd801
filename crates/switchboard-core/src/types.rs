// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the delivery and fanout subsystems.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Outbox item type for "send a text into the operator channel".
pub const CHANNEL_SEND: &str = "channel_send";

/// The external product's default "general" topic.
pub const ROOT_THREAD_ID: i64 = 1;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
    Observability,
    Broadcast,
}

/// Lifecycle state of an [`OutboxItem`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OutboxStatus {
    Pending,
    Processing,
    Done,
    /// Parked after exhausting the configured attempt cap.
    Dead,
}

/// One requested delivery, persisted before it is attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxItem {
    pub id: String,
    pub tenant_id: String,
    /// Discriminator selecting the handler, e.g. [`CHANNEL_SEND`].
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    /// Lease expiry while PROCESSING; an expired lease makes the item claimable again.
    pub locked_until: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Producer-side request to create an [`OutboxItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOutboxItem {
    pub tenant_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
}

impl NewOutboxItem {
    /// Builds a [`CHANNEL_SEND`] request.
    pub fn channel_send(
        tenant_id: impl Into<String>,
        payload: &ChannelSendPayload,
        idempotency_key: Option<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            tenant_id: tenant_id.into(),
            kind: CHANNEL_SEND.to_string(),
            payload: serde_json::to_value(payload)?,
            idempotency_key,
        })
    }
}

/// Payload of a [`CHANNEL_SEND`] outbox item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSendPayload {
    pub destination: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
}

/// Whether a conversation belongs to a customer or is the tenant-wide root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Customer,
    /// Collects operator messages posted outside any topic.
    Root,
}

/// A support thread owned by one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub kind: ConversationKind,
    pub thread_id: Option<i64>,
    pub codename: String,
    pub created_at: DateTime<Utc>,
    pub last_customer_at: Option<DateTime<Utc>>,
    pub last_operator_at: Option<DateTime<Utc>>,
}

/// Who sent a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Customer to operator.
    Inbound,
    /// Operator to customer.
    Outbound,
}

/// An append-only conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub tenant_id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Request to append a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub tenant_id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub text: String,
}

/// Decrypted channel configuration for one tenant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub tenant_id: String,
    /// Path-embedded secret identifying the tenant on webhook calls.
    pub webhook_secret: String,
    pub bot_token: String,
    /// Chat id of the operator support group.
    pub destination_id: String,
    /// Expected value of the webhook secret header, when configured.
    pub header_secret: Option<String>,
    pub default_thread_id: Option<i64>,
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("tenant_id", &self.tenant_id)
            .field("webhook_secret", &"[redacted]")
            .field("bot_token", &"[redacted]")
            .field("destination_id", &self.destination_id)
            .field(
                "header_secret",
                &self.header_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("default_thread_id", &self.default_thread_id)
            .finish()
    }
}

/// Frame pushed to every live viewer of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutPayload {
    pub direction: Direction,
    pub text: String,
}

/// A message observed on a shared broadcast medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEnvelope {
    pub channel: String,
    pub body: String,
}

/// Identity carried by a verified real-time subscription token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeClaims {
    pub tenant_id: String,
    pub conversation_id: String,
    /// Expiry as unix seconds.
    pub exp: i64,
}
