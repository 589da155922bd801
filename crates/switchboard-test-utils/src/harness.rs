// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for cross-crate integration tests.
//!
//! `TestHarness` assembles a temp SQLite store with seeded channel
//! configurations, a [`MockChannel`], a local fanout hub and bridge, and a
//! metrics object. Components under test are built from these parts.

use std::sync::Arc;

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{ChannelConfig, StorageAdapter, SwitchboardError};
use switchboard_fanout::{LocalBridge, LocalHub};
use switchboard_prometheus::DeliveryMetrics;
use switchboard_storage::SqliteStorage;

use crate::mock_channel::MockChannel;

/// Operator group chat id used by [`sample_channel`].
pub const SAMPLE_GROUP_ID: i64 = -100_200_300;

/// A complete channel configuration for `tenant_id`.
///
/// The webhook secret is `secret-{tenant_id}`, no header secret is set.
pub fn sample_channel(tenant_id: &str) -> ChannelConfig {
    ChannelConfig {
        tenant_id: tenant_id.to_string(),
        webhook_secret: format!("secret-{tenant_id}"),
        bot_token: format!("token-{tenant_id}"),
        destination_id: SAMPLE_GROUP_ID.to_string(),
        header_secret: None,
        default_thread_id: None,
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    channels: Vec<ChannelConfig>,
    thread_id: Option<i64>,
    config: SwitchboardConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            channels: Vec::new(),
            thread_id: None,
            config: SwitchboardConfig::default(),
        }
    }

    /// Seeds a channel configuration.
    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channels.push(channel);
        self
    }

    /// Makes the mock channel assign `thread_id` to created threads.
    pub fn with_thread_id(mut self, thread_id: i64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Adjusts the configuration handed to components under test.
    pub fn with_config(mut self, edit: impl FnOnce(&mut SwitchboardConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchboardError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SwitchboardError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage.database_path = db_path.to_string_lossy().to_string();

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        for channel in &self.channels {
            storage.upsert_channel(channel).await?;
        }

        let channel = match self.thread_id {
            Some(id) => MockChannel::with_thread_id(id),
            None => MockChannel::new(),
        };
        let metrics = Arc::new(DeliveryMetrics::new());
        let hub = Arc::new(LocalHub::new());
        let bridge = Arc::new(LocalBridge::new(Arc::clone(&hub), Arc::clone(&metrics)));

        Ok(TestHarness {
            storage: Arc::new(storage),
            channel: Arc::new(channel),
            hub,
            bridge,
            metrics,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock channel and temp storage.
pub struct TestHarness {
    pub storage: Arc<SqliteStorage>,
    pub channel: Arc<MockChannel>,
    pub hub: Arc<LocalHub>,
    pub bridge: Arc<LocalBridge>,
    pub metrics: Arc<DeliveryMetrics>,
    pub config: SwitchboardConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Path of the harness database, for opening extra handles.
    pub fn database_path(&self) -> &str {
        &self.config.storage.database_path
    }

    /// Drops `table` so every storage call that touches it fails.
    pub async fn drop_table(&self, table: &str) -> Result<(), SwitchboardError> {
        let sql = format!("DROP TABLE {table}");
        self.storage
            .database()?
            .connection()
            .call(move |conn| conn.execute_batch(&sql))
            .await
            .map_err(switchboard_storage::database::map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::ChannelDirectory;

    #[tokio::test]
    async fn build_seeds_channels() {
        let harness = TestHarness::builder()
            .with_channel(sample_channel("t1"))
            .build()
            .await
            .unwrap();

        let found = harness.storage.for_tenant("t1").await.unwrap().unwrap();
        assert_eq!(found, sample_channel("t1"));
        assert!(harness.storage.for_tenant("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn config_edits_apply() {
        let harness = TestHarness::builder()
            .with_config(|c| c.delivery.inline_send = false)
            .build()
            .await
            .unwrap();
        assert!(!harness.config.delivery.inline_send);
        assert!(harness.database_path().ends_with("test.db"));
    }

    #[tokio::test]
    async fn dropped_table_fails_its_queries() {
        let harness = TestHarness::builder()
            .with_channel(sample_channel("t1"))
            .build()
            .await
            .unwrap();
        harness.drop_table("channels").await.unwrap();
        assert!(harness.storage.for_tenant("t1").await.is_err());
    }
}
