// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter`, records every successful call
//! for assertions, and can be scripted to fail sends or thread creation.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use switchboard_core::{
    AdapterType, ChannelAdapter, ChannelConfig, HealthStatus, PluginAdapter, SwitchboardError,
};

/// A text the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub tenant_id: String,
    pub destination: String,
    pub thread_id: Option<i64>,
    pub text: String,
}

/// A thread the mock created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedThread {
    pub destination: String,
    pub name: String,
    pub thread_id: i64,
}

/// Scripted stand-in for the operator channel.
pub struct MockChannel {
    sent: Mutex<Vec<SentText>>,
    threads: Mutex<Vec<CreatedThread>>,
    /// Sends that will fail before one succeeds. `u32::MAX` fails forever.
    failing_sends: AtomicU32,
    failing_threads: AtomicU32,
    send_attempts: AtomicU32,
    thread_attempts: AtomicU32,
    next_thread_id: AtomicI64,
    /// When set every created thread gets this id.
    fixed_thread_id: Option<i64>,
}

impl MockChannel {
    /// A mock whose created threads are numbered from 1000.
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            failing_sends: AtomicU32::new(0),
            failing_threads: AtomicU32::new(0),
            send_attempts: AtomicU32::new(0),
            thread_attempts: AtomicU32::new(0),
            next_thread_id: AtomicI64::new(1000),
            fixed_thread_id: None,
        }
    }

    /// A mock that assigns `thread_id` to every created thread.
    pub fn with_thread_id(thread_id: i64) -> Self {
        Self {
            fixed_thread_id: Some(thread_id),
            ..Self::new()
        }
    }

    /// Makes the next `count` sends fail.
    pub fn fail_sends(&self, count: u32) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Makes every send fail until reset with `fail_sends(0)`.
    pub fn fail_all_sends(&self) {
        self.fail_sends(u32::MAX);
    }

    /// Makes every thread creation fail, or succeed again with `false`.
    pub fn fail_thread_creation(&self, fail: bool) {
        let count = if fail { u32::MAX } else { 0 };
        self.failing_threads.store(count, Ordering::SeqCst);
    }

    /// Texts accepted so far, in order.
    pub async fn sent_messages(&self) -> Vec<SentText> {
        self.sent.lock().await.clone()
    }

    /// Count of accepted texts.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Threads created so far.
    pub async fn created_threads(&self) -> Vec<CreatedThread> {
        self.threads.lock().await.clone()
    }

    /// Send calls made, failed ones included.
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Thread creation calls made, failed ones included.
    pub fn thread_attempts(&self) -> u32 {
        self.thread_attempts.load(Ordering::SeqCst)
    }

    /// Consumes one scripted failure, if any remain.
    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }

    async fn record_send(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        thread_id: Option<i64>,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_sends) {
            return Err(SwitchboardError::channel("mock send failure"));
        }
        self.sent.lock().await.push(SentText {
            tenant_id: credentials.tenant_id.clone(),
            destination: destination.to_string(),
            thread_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn send_text(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        self.record_send(credentials, destination, None, text).await
    }

    async fn send_text_in_thread(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        thread_id: i64,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        self.record_send(credentials, destination, Some(thread_id), text)
            .await
    }

    async fn create_thread(
        &self,
        _credentials: &ChannelConfig,
        destination: &str,
        name: &str,
    ) -> Result<i64, SwitchboardError> {
        self.thread_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_threads) {
            return Err(SwitchboardError::channel("mock thread creation failure"));
        }
        let thread_id = match self.fixed_thread_id {
            Some(id) => id,
            None => self.next_thread_id.fetch_add(1, Ordering::SeqCst),
        };
        self.threads.lock().await.push(CreatedThread {
            destination: destination.to_string(),
            name: name.to_string(),
            thread_id,
        });
        Ok(thread_id)
    }
}
