// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Switchboard.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! connection per process via `tokio-rusqlite`, and the conditional
//! statements the delivery subsystem relies on: idempotent outbox enqueue,
//! leased claim, set-if-unset thread binding, and set-if-absent dedup
//! markers. The `broadcast_events` table doubles as a cross-process
//! pub/sub medium.

pub mod adapter;
pub mod broadcast;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use broadcast::SqliteBroadcast;
pub use database::{Database, OpenOptions};
