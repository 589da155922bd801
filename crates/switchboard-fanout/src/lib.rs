// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time fanout for Switchboard.
//!
//! A [`LocalHub`] tracks the live viewer connections of this process. A
//! [`FanoutBridge`](switchboard_core::FanoutBridge) decides whether a
//! publish stays local ([`LocalBridge`]) or travels through a shared
//! [`BroadcastMedium`](switchboard_core::BroadcastMedium) to every instance
//! ([`SharedBridge`]).

pub mod bridge;
pub mod hub;
pub mod medium;

pub use bridge::{LocalBridge, SharedBridge, channel_for};
pub use hub::{Connection, LocalHub};
pub use medium::InMemoryMedium;
