// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchboard integration tests.
//!
//! Provides a mock operator channel and a harness wiring real storage and
//! fanout for fast, deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock channel adapter with call capture and scripted failures
//! - [`TestHarness`] - Temp database, seeded channels, hub, bridge and metrics

pub mod harness;
pub mod mock_channel;

pub use harness::{SAMPLE_GROUP_ID, TestHarness, TestHarnessBuilder, sample_channel};
pub use mock_channel::{CreatedThread, MockChannel, SentText};
