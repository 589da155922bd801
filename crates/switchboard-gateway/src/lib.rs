// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket gateway for Switchboard.
//!
//! Exposes the provider webhook, the customer and outbox APIs, real-time
//! subscriptions, and health/metrics endpoints on one axum router.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod webhook;
pub mod ws;

pub use auth::{AuthConfig, HmacTokenVerifier};
pub use server::{GatewayState, HealthState, bind, router, serve};
