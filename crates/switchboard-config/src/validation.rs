// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express:
//! listener address, non-empty paths, positive intervals, and unique
//! channel entries.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::SwitchboardConfig;

/// Most attempts a single Bot API call may make on rate limits.
pub const TELEGRAM_MAX_ATTEMPTS: u32 = 3;

/// Longest single wait on a Bot API rate limit.
pub const TELEGRAM_MAX_RETRY_WAIT_SECS: u64 = 15;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &SwitchboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    let webhook_path = config.server.webhook_path.trim_matches('/');
    if webhook_path.is_empty() || webhook_path.contains('/') {
        fail(format!(
            "server.webhook_path must be a single path segment, got `{}`",
            config.server.webhook_path
        ));
    }

    if config.server.secret_header.trim().is_empty() {
        fail("server.secret_header must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    for (key, value) in [
        ("outbox.idle_interval_ms", config.outbox.idle_interval_ms),
        ("outbox.lease_secs", config.outbox.lease_secs),
        ("telegram.request_timeout_secs", config.telegram.request_timeout_secs),
        ("fanout.poll_interval_ms", config.fanout.poll_interval_ms),
        ("webhook.dedup_ttl_secs", config.webhook.dedup_ttl_secs),
    ] {
        if value == 0 {
            fail(format!("{key} must be greater than 0"));
        }
    }

    if config.outbox.max_attempts == Some(0) {
        fail("outbox.max_attempts must be at least 1 when set".to_string());
    }

    if !(1..=TELEGRAM_MAX_ATTEMPTS).contains(&config.telegram.max_attempts) {
        fail(format!(
            "telegram.max_attempts must be between 1 and {TELEGRAM_MAX_ATTEMPTS}, got {}",
            config.telegram.max_attempts
        ));
    }

    if config.telegram.max_retry_wait_secs > TELEGRAM_MAX_RETRY_WAIT_SECS {
        fail(format!(
            "telegram.max_retry_wait_secs must be at most {TELEGRAM_MAX_RETRY_WAIT_SECS}, got {}",
            config.telegram.max_retry_wait_secs
        ));
    }

    if config.fanout.channel_capacity == 0 {
        fail("fanout.channel_capacity must be greater than 0".to_string());
    }

    if config.fanout.retention_secs.saturating_mul(1000) < config.fanout.poll_interval_ms {
        fail(format!(
            "fanout.retention_secs ({}s) must cover at least one poll interval ({}ms)",
            config.fanout.retention_secs, config.fanout.poll_interval_ms
        ));
    }

    let mut tenants = HashSet::new();
    let mut secrets = HashSet::new();
    for (i, channel) in config.channels.iter().enumerate() {
        if channel.tenant_id.trim().is_empty() {
            fail(format!("channels[{i}].tenant_id must not be empty"));
        } else if !tenants.insert(channel.tenant_id.as_str()) {
            fail(format!(
                "duplicate tenant `{}` in [[channels]] array",
                channel.tenant_id
            ));
        }
        if channel.webhook_secret.trim().is_empty() {
            fail(format!("channels[{i}].webhook_secret must not be empty"));
        } else if !secrets.insert(channel.webhook_secret.as_str()) {
            fail(format!("channels[{i}].webhook_secret is already in use"));
        }
        if channel.destination_id.trim().is_empty() {
            fail(format!("channels[{i}].destination_id must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelEntry;

    fn channel(tenant: &str, secret: &str) -> ChannelEntry {
        ChannelEntry {
            tenant_id: tenant.into(),
            webhook_secret: secret.into(),
            bot_token: "123:ABC".into(),
            destination_id: "-100".into(),
            header_secret: None,
            default_thread_id: None,
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SwitchboardConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SwitchboardConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("database_path"));
    }

    #[test]
    fn zero_intervals_fail_validation() {
        let mut config = SwitchboardConfig::default();
        config.outbox.idle_interval_ms = 0;
        config.outbox.lease_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn zero_max_attempts_fails_validation() {
        let mut config = SwitchboardConfig::default();
        config.outbox.max_attempts = Some(0);
        assert!(validate_config(&config).is_err());
        config.outbox.max_attempts = Some(5);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn telegram_retry_caps_are_enforced() {
        let mut config = SwitchboardConfig::default();
        config.telegram.max_attempts = 4;
        config.telegram.max_retry_wait_secs = 16;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("telegram.max_attempts"));
        assert!(errors[1].to_string().contains("telegram.max_retry_wait_secs"));

        config.telegram.max_attempts = 3;
        config.telegram.max_retry_wait_secs = 15;
        assert!(validate_config(&config).is_ok());

        config.telegram.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn huge_retention_does_not_overflow() {
        let mut config = SwitchboardConfig::default();
        config.fanout.retention_secs = u64::MAX;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn nested_webhook_path_fails_validation() {
        let mut config = SwitchboardConfig::default();
        config.server.webhook_path = "hooks/telegram".into();
        assert!(validate_config(&config).is_err());
        config.server.webhook_path = "/hooks/".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn invalid_host_fails_validation() {
        let mut config = SwitchboardConfig::default();
        config.server.host = "not a host!".into();
        assert!(validate_config(&config).is_err());
        config.server.host = "::1".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn duplicate_channels_fail_validation() {
        let mut config = SwitchboardConfig::default();
        config.channels = vec![channel("t1", "s1"), channel("t1", "s1")];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2, "tenant and secret duplicates reported");
    }

    #[test]
    fn collects_all_errors() {
        let mut config = SwitchboardConfig::default();
        config.storage.database_path = " ".into();
        config.server.secret_header = "".into();
        config.fanout.channel_capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
