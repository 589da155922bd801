// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All async traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod auth;
pub mod channel;
pub mod directory;
pub mod fanout;
pub mod storage;

pub use adapter::PluginAdapter;
pub use auth::TokenVerifier;
pub use channel::ChannelAdapter;
pub use directory::ChannelDirectory;
pub use fanout::{BroadcastMedium, BroadcastSubscription, FanoutBridge};
pub use storage::StorageAdapter;
