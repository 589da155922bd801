// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter and ChannelDirectory traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use switchboard_config::model::StorageConfig;
use switchboard_core::types::{Conversation, Message, NewMessage, NewOutboxItem, OutboxItem};
use switchboard_core::{
    AdapterType, ChannelConfig, ChannelDirectory, HealthStatus, PluginAdapter, StorageAdapter,
    SwitchboardError,
};

use crate::database::{Database, OpenOptions, checkpoint, map_tr_err};
use crate::queries;
use crate::queries::conversations::Activity;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened by [`StorageAdapter::initialize`]; every other call
/// fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Creates an adapter; the database is not opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Creates an adapter for `path` with default options.
    pub fn at_path(path: impl Into<String>) -> Self {
        Self::new(StorageConfig {
            database_path: path.into(),
            ..StorageConfig::default()
        })
    }

    fn db(&self) -> Result<&Database, SwitchboardError> {
        self.db.get().ok_or_else(|| SwitchboardError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// A handle to the open database, for components that share the
    /// connection (the broadcast medium).
    pub fn database(&self) -> Result<Database, SwitchboardError> {
        self.db().cloned()
    }

    /// Inserts or replaces a tenant's channel configuration.
    pub async fn upsert_channel(&self, config: &ChannelConfig) -> Result<(), SwitchboardError> {
        queries::channels::upsert(self.db()?, config, Utc::now()).await
    }

    /// Deletes expired webhook dedup markers.
    pub async fn purge_expired_markers(&self) -> Result<usize, SwitchboardError> {
        queries::dedup::purge_expired(self.db()?, Utc::now()).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        if let Some(db) = self.db.get() {
            checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SwitchboardError> {
        let options = OpenOptions {
            wal_mode: self.config.wal_mode,
            busy_timeout: Duration::from_millis(self.config.busy_timeout_ms),
        };
        let db = Database::open_with(&self.config.database_path, &options).await?;
        self.db.set(db).map_err(|_| SwitchboardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SwitchboardError> {
        checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Outbox ---

    async fn enqueue(&self, item: NewOutboxItem) -> Result<OutboxItem, SwitchboardError> {
        queries::outbox::enqueue(self.db()?, item, Utc::now()).await
    }

    async fn claim_next(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Option<OutboxItem>, SwitchboardError> {
        queries::outbox::claim_next(self.db()?, now, lease).await
    }

    async fn mark_done(&self, id: &str) -> Result<(), SwitchboardError> {
        queries::outbox::mark_done(self.db()?, id, Utc::now()).await
    }

    async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        backoff: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), SwitchboardError> {
        queries::outbox::mark_failed(self.db()?, id, error, backoff, now).await
    }

    async fn mark_dead(&self, id: &str, error: &str) -> Result<(), SwitchboardError> {
        queries::outbox::mark_dead(self.db()?, id, error, Utc::now()).await
    }

    async fn get_outbox_item(&self, id: &str) -> Result<Option<OutboxItem>, SwitchboardError> {
        queries::outbox::get(self.db()?, id).await
    }

    // --- Conversations ---

    async fn create_conversation(
        &self,
        tenant_id: &str,
        codename: &str,
    ) -> Result<Conversation, SwitchboardError> {
        queries::conversations::create(self.db()?, tenant_id, codename, Utc::now()).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::get(self.db()?, id).await
    }

    async fn set_thread_if_unset(
        &self,
        conversation_id: &str,
        thread_id: i64,
    ) -> Result<Option<i64>, SwitchboardError> {
        queries::conversations::set_thread_if_unset(self.db()?, conversation_id, thread_id).await
    }

    async fn override_thread(
        &self,
        conversation_id: &str,
        thread_id: Option<i64>,
    ) -> Result<(), SwitchboardError> {
        queries::conversations::override_thread(self.db()?, conversation_id, thread_id).await
    }

    async fn find_or_create_by_thread(
        &self,
        tenant_id: &str,
        thread_id: i64,
        codename: &str,
    ) -> Result<Conversation, SwitchboardError> {
        queries::conversations::find_or_create_by_thread(
            self.db()?,
            tenant_id,
            thread_id,
            codename,
            Utc::now(),
        )
        .await
    }

    async fn find_or_create_root(&self, tenant_id: &str) -> Result<Conversation, SwitchboardError> {
        queries::conversations::find_or_create_root(self.db()?, tenant_id, Utc::now()).await
    }

    async fn touch_operator_activity(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SwitchboardError> {
        queries::conversations::touch(self.db()?, conversation_id, Activity::Operator, at).await
    }

    async fn touch_customer_activity(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SwitchboardError> {
        queries::conversations::touch(self.db()?, conversation_id, Activity::Customer, at).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: NewMessage) -> Result<Message, SwitchboardError> {
        queries::messages::insert_message(self.db()?, message, Utc::now()).await
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, SwitchboardError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id, limit).await
    }

    // --- Webhook dedup markers ---

    async fn mark_event_if_absent(
        &self,
        tenant_id: &str,
        event_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        queries::dedup::mark_if_absent(self.db()?, tenant_id, event_id, ttl, now).await
    }
}

#[async_trait]
impl ChannelDirectory for SqliteStorage {
    async fn by_webhook_secret(
        &self,
        secret: &str,
    ) -> Result<Option<ChannelConfig>, SwitchboardError> {
        queries::channels::by_webhook_secret(self.db()?, secret).await
    }

    async fn for_tenant(&self, tenant_id: &str) -> Result<Option<ChannelConfig>, SwitchboardError> {
        queries::channels::for_tenant(self.db()?, tenant_id).await
    }
}
