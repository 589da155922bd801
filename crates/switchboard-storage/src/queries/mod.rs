// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes a [`Database`](crate::Database)
//! and runs its statements on the single writer thread.

pub mod broadcast;
pub mod channels;
pub mod conversations;
pub mod dedup;
pub mod messages;
pub mod outbox;
