// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the delivery subsystem's persistent state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, Message, NewMessage, NewOutboxItem, OutboxItem};

/// Adapter for the relational store behind the outbox, conversations,
/// messages, and webhook dedup markers.
///
/// Every state transition that must be safe across processes is a single
/// conditional statement in the backend (conditional insert for enqueue and
/// dedup, conditional update for claim and thread assignment).
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection).
    async fn initialize(&self) -> Result<(), SwitchboardError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), SwitchboardError>;

    // --- Outbox ---

    /// Creates a PENDING item, or returns the existing item unchanged when
    /// one already exists for the same tenant and idempotency key.
    async fn enqueue(&self, item: NewOutboxItem) -> Result<OutboxItem, SwitchboardError>;

    /// Claims the oldest eligible item, moving it to PROCESSING with a lease
    /// of `lease`. Returns `None` when nothing is eligible or another
    /// worker won the race.
    async fn claim_next(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Option<OutboxItem>, SwitchboardError>;

    /// Marks an item DONE. Calling it twice is harmless.
    async fn mark_done(&self, id: &str) -> Result<(), SwitchboardError>;

    /// Returns an item to PENDING with one more attempt recorded and the
    /// next attempt scheduled `backoff` after `now`.
    async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        backoff: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), SwitchboardError>;

    /// Parks an item as DEAD with one more attempt recorded.
    async fn mark_dead(&self, id: &str, error: &str) -> Result<(), SwitchboardError>;

    /// Reads an outbox item by id.
    async fn get_outbox_item(&self, id: &str) -> Result<Option<OutboxItem>, SwitchboardError>;

    // --- Conversations ---

    /// Creates a customer conversation.
    async fn create_conversation(
        &self,
        tenant_id: &str,
        codename: &str,
    ) -> Result<Conversation, SwitchboardError>;

    /// Reads a conversation by id.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError>;

    /// Stores `thread_id` only if the conversation has none yet and returns
    /// the thread id stored afterwards (the winner under a race).
    async fn set_thread_if_unset(
        &self,
        conversation_id: &str,
        thread_id: i64,
    ) -> Result<Option<i64>, SwitchboardError>;

    /// Operator override: replaces or clears the conversation's thread id.
    ///
    /// Entry point for the admin collaborator that rebinds a conversation
    /// to another operator thread. Delivery paths never call it; they use
    /// [`set_thread_if_unset`](Self::set_thread_if_unset).
    async fn override_thread(
        &self,
        conversation_id: &str,
        thread_id: Option<i64>,
    ) -> Result<(), SwitchboardError>;

    /// Finds the tenant's conversation bound to `thread_id`, creating it
    /// with `codename` when absent.
    async fn find_or_create_by_thread(
        &self,
        tenant_id: &str,
        thread_id: i64,
        codename: &str,
    ) -> Result<Conversation, SwitchboardError>;

    /// Finds or creates the tenant-wide root conversation.
    async fn find_or_create_root(&self, tenant_id: &str) -> Result<Conversation, SwitchboardError>;

    /// Stamps the last operator activity time.
    async fn touch_operator_activity(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SwitchboardError>;

    /// Stamps the last customer activity time.
    async fn touch_customer_activity(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SwitchboardError>;

    // --- Messages ---

    /// Appends a message.
    async fn insert_message(&self, message: NewMessage) -> Result<Message, SwitchboardError>;

    /// Lists messages of a conversation in chronological order.
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, SwitchboardError>;

    // --- Webhook dedup markers ---

    /// Atomically sets the marker for (`tenant_id`, `event_id`) unless a
    /// live one exists. Returns `true` when this call set it.
    async fn mark_event_if_absent(
        &self,
        tenant_id: &str,
        event_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError>;
}
