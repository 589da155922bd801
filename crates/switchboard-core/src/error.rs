// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every Switchboard crate.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Switchboard adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External channel errors (transport failure, non-success response).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The external channel kept answering with a rate limit until the
    /// per-call attempt budget ran out.
    #[error("channel rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller failed authentication.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Shorthand for a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }
}
