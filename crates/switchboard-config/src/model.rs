// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Switchboard.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use switchboard_core::ChannelConfig;

/// Top-level Switchboard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// HTTP listener and webhook routing.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbox worker settings.
    #[serde(default)]
    pub outbox: OutboxConfig,

    /// Telegram Bot API client settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Customer message delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Inbound webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Cross-instance fanout settings.
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Real-time subscription token settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Tenant channel configurations seeded into storage at startup.
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the internal API. `None` disables the internal API.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// First path segment of the webhook route (`POST /{webhook_path}/{secret}`).
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Header carrying the provider's webhook secret.
    #[serde(default = "default_secret_header")]
    pub secret_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            webhook_path: default_webhook_path(),
            secret_header: default_secret_header(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    "telegram-webhook".to_string()
}

fn default_secret_header() -> String {
    "x-telegram-bot-api-secret-token".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a lock held by another process.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("switchboard").join("switchboard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("switchboard.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Outbox worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutboxConfig {
    /// Wait between polls when the outbox is empty.
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Fixed delay before a failed item becomes eligible again.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// How long a claimed item stays invisible to other workers.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Time given to an in-flight dispatch after shutdown is requested.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Attempts after which an item is parked as DEAD. `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            lease_secs: default_lease_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            max_attempts: None,
        }
    }
}

fn default_idle_interval_ms() -> u64 {
    250
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_lease_secs() -> u64 {
    120
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// Telegram Bot API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Base URL of the Bot API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Attempts per call when the API answers with a rate limit.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upper bound on a single rate-limit wait.
    #[serde(default = "default_max_retry_wait_secs")]
    pub max_retry_wait_secs: u64,

    /// HTTP request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum forum topic name length accepted by the API.
    #[serde(default = "default_topic_name_limit")]
    pub topic_name_limit: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            max_attempts: default_max_attempts(),
            max_retry_wait_secs: default_max_retry_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            topic_name_limit: default_topic_name_limit(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_retry_wait_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_topic_name_limit() -> usize {
    128
}

/// Customer message delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Try the channel once inline before falling back to the outbox.
    #[serde(default = "default_inline_send")]
    pub inline_send: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            inline_send: default_inline_send(),
        }
    }
}

fn default_inline_send() -> bool {
    true
}

/// Inbound webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Lifetime of a processed-update marker.
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

fn default_dedup_ttl_secs() -> u64 {
    600
}

/// Cross-instance fanout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    /// Relay fanout through the shared database so every process sees it.
    #[serde(default)]
    pub distributed: bool,

    /// How often a process tails the shared broadcast log.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long broadcast events are kept before pruning.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Buffered frames per live connection.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            distributed: false,
            poll_interval_ms: default_poll_interval_ms(),
            retention_secs: default_retention_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_retention_secs() -> u64 {
    300
}

fn default_channel_capacity() -> usize {
    64
}

/// Real-time subscription token configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// HMAC secret used to verify subscription tokens. `None` rejects every token.
    #[serde(default)]
    pub token_secret: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One `[[channels]]` entry: a tenant's already-decrypted channel settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelEntry {
    pub tenant_id: String,
    pub webhook_secret: String,
    pub bot_token: String,
    pub destination_id: String,
    #[serde(default)]
    pub header_secret: Option<String>,
    #[serde(default)]
    pub default_thread_id: Option<i64>,
}

impl From<&ChannelEntry> for ChannelConfig {
    fn from(entry: &ChannelEntry) -> Self {
        ChannelConfig {
            tenant_id: entry.tenant_id.clone(),
            webhook_secret: entry.webhook_secret.clone(),
            bot_token: entry.bot_token.clone(),
            destination_id: entry.destination_id.clone(),
            header_secret: entry.header_secret.clone(),
            default_thread_id: entry.default_thread_id,
        }
    }
}
