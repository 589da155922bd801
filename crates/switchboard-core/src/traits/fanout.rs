// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits for cross-instance fanout.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::types::{BroadcastEnvelope, FanoutPayload};

/// Delivers a payload to every live viewer of a conversation, in this
/// process and (when distributed) in every other process.
///
/// Publishing is best-effort and never fails from the caller's view.
#[async_trait]
pub trait FanoutBridge: Send + Sync {
    async fn publish(&self, conversation_id: &str, payload: &FanoutPayload);
}

/// A shared pub/sub medium reachable from every process.
#[async_trait]
pub trait BroadcastMedium: Send + Sync + 'static {
    /// Publishes `body` on `channel`.
    async fn publish(&self, channel: &str, body: &str) -> Result<(), SwitchboardError>;

    /// Opens a subscription that observes messages published after this call.
    async fn subscribe(&self) -> Result<Box<dyn BroadcastSubscription>, SwitchboardError>;
}

/// An open subscription on a [`BroadcastMedium`].
#[async_trait]
pub trait BroadcastSubscription: Send {
    /// Waits for the next message. `Ok(None)` means the medium closed.
    async fn next(&mut self) -> Result<Option<BroadcastEnvelope>, SwitchboardError>;
}
