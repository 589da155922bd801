// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the operator-side messaging product.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChannelConfig;

/// Performs single delivery calls against the external operator channel.
///
/// Implementations are stateless with respect to storage: credentials are
/// passed on every call and nothing is persisted. Short in-call retries (for
/// rate limits) are allowed; everything beyond that belongs to the outbox.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Sends a plain text message to `destination`.
    async fn send_text(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        text: &str,
    ) -> Result<(), SwitchboardError>;

    /// Sends a plain text message into a thread of `destination`.
    async fn send_text_in_thread(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        thread_id: i64,
        text: &str,
    ) -> Result<(), SwitchboardError>;

    /// Creates a thread named `name` in `destination` and returns its id.
    async fn create_thread(
        &self,
        credentials: &ChannelConfig,
        destination: &str,
        name: &str,
    ) -> Result<i64, SwitchboardError>;
}
