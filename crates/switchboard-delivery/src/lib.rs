// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery pipeline for Switchboard.
//!
//! - [`OutboxWorker`] drains persisted deliveries with at-least-once
//!   semantics
//! - [`ThreadResolver`] binds conversations to operator threads on demand
//! - [`WebhookIngestor`] turns provider webhooks into stored operator
//!   replies and live fanout
//! - [`CustomerMessages`] records customer messages and sends them on
//! - [`shutdown`] wires process signals to a cancellation token

pub mod customer;
pub mod ingest;
pub mod policy;
pub mod shutdown;
pub mod threads;
pub mod worker;

pub use customer::{CustomerMessages, DeliveryState, SentMessage};
pub use ingest::{IngestOutcome, WebhookIngestor};
pub use policy::best_effort;
pub use threads::ThreadResolver;
pub use worker::{ChannelSendHandler, OutboxHandler, OutboxWorker, TickOutcome, WorkerSettings};
