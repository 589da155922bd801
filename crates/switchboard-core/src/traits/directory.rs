// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup of per-tenant channel configuration.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::types::ChannelConfig;

/// Resolves decrypted channel configuration.
///
/// Encryption of stored secrets is owned by the collaborator behind this
/// trait; callers only ever see plain values.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Finds the channel whose webhook path secret equals `secret`.
    async fn by_webhook_secret(&self, secret: &str)
    -> Result<Option<ChannelConfig>, SwitchboardError>;

    /// Finds the channel configured for `tenant_id`.
    async fn for_tenant(&self, tenant_id: &str) -> Result<Option<ChannelConfig>, SwitchboardError>;
}
