// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Switchboard configuration system.

use std::io::Write;

use switchboard_config::diagnostic::ConfigError;
use switchboard_config::model::SwitchboardConfig;
use switchboard_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use switchboard_core::ChannelConfig;

#[test]
fn valid_toml_deserializes_into_switchboard_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
bearer_token = "internal"
webhook_path = "tg"

[storage]
database_path = "/tmp/switchboard.db"
wal_mode = false

[outbox]
retry_backoff_ms = 500
max_attempts = 8

[telegram]
api_base = "http://localhost:9999"

[delivery]
inline_send = false

[fanout]
distributed = true
poll_interval_ms = 50

[realtime]
token_secret = "s3cret"

[log]
level = "debug"

[[channels]]
tenant_id = "t1"
webhook_secret = "path-secret"
bot_token = "123:ABC"
destination_id = "-1001"
header_secret = "hdr"
default_thread_id = 7
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.bearer_token.as_deref(), Some("internal"));
    assert_eq!(config.server.webhook_path, "tg");
    assert_eq!(config.storage.database_path, "/tmp/switchboard.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.outbox.retry_backoff_ms, 500);
    assert_eq!(config.outbox.max_attempts, Some(8));
    assert_eq!(config.telegram.api_base, "http://localhost:9999");
    assert!(!config.delivery.inline_send);
    assert!(config.fanout.distributed);
    assert_eq!(config.fanout.poll_interval_ms, 50);
    assert_eq!(config.realtime.token_secret.as_deref(), Some("s3cret"));
    assert_eq!(config.log.level, "debug");

    let channel = ChannelConfig::from(&config.channels[0]);
    assert_eq!(channel.tenant_id, "t1");
    assert_eq!(channel.destination_id, "-1001");
    assert_eq!(channel.header_secret.as_deref(), Some("hdr"));
    assert_eq!(channel.default_thread_id, Some(7));
}

#[test]
fn defaults_match_documented_values() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.server.webhook_path, "telegram-webhook");
    assert_eq!(
        config.server.secret_header,
        "x-telegram-bot-api-secret-token"
    );
    assert_eq!(config.outbox.retry_backoff_ms, 2000);
    assert_eq!(config.outbox.max_attempts, None);
    assert_eq!(config.telegram.max_attempts, 3);
    assert_eq!(config.telegram.max_retry_wait_secs, 15);
    assert_eq!(config.telegram.request_timeout_secs, 30);
    assert_eq!(config.telegram.topic_name_limit, 128);
    assert!(config.delivery.inline_send);
    assert_eq!(config.webhook.dedup_ttl_secs, 600);
    assert!(!config.fanout.distributed);
    assert!(config.channels.is_empty());
    assert!(config.storage.database_path.ends_with("switchboard.db"));
}

#[test]
fn unknown_field_in_outbox_is_rejected() {
    let err = load_config_from_str("[outbox]\nretry_backof_ms = 5\n")
        .expect_err("should reject unknown field");
    assert!(format!("{err}").contains("retry_backof_ms"));
}

#[test]
fn unknown_top_level_section_is_rejected() {
    assert!(load_config_from_str("[agent]\nname = \"x\"\n").is_err());
}

#[test]
fn unknown_key_diagnostic_suggests_correction() {
    let errors = load_and_validate_str("[server]\nbearer_tokn = \"x\"\n").unwrap_err();
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            valid_keys,
            ..
        } => {
            assert_eq!(key, "bearer_tokn");
            assert_eq!(suggestion.as_deref(), Some("bearer_token"));
            assert!(valid_keys.contains("webhook_path"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn invalid_type_diagnostic_names_key() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n").unwrap_err();
    match &errors[0] {
        ConfigError::InvalidType { key, .. } => assert_eq!(key, "server.port"),
        other => panic!("expected InvalidType, got {other:?}"),
    }
}

#[test]
fn missing_channel_field_reports_missing_key() {
    let toml = r#"
[[channels]]
tenant_id = "t1"
webhook_secret = "s"
destination_id = "-1"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::MissingKey { key } if key == "bot_token"
    )));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[fanout]\ndistribute = true\n").unwrap_err();
    let diagnostic: &dyn Diagnostic = &errors[0];
    assert!(diagnostic.code().is_some());

    let mut out = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut out, diagnostic)
        .expect("render");
    assert!(out.contains("distribute"));
}

#[test]
fn validation_runs_after_successful_parse() {
    let errors = load_and_validate_str("[outbox]\nmax_attempts = 0\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
fn telegram_retry_caps_are_validated_from_toml() {
    let errors =
        load_and_validate_str("[telegram]\nmax_attempts = 10\nmax_retry_wait_secs = 60\n")
            .unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = 4100").unwrap();

    let config: SwitchboardConfig = load_and_validate_path(file.path()).expect("valid file");
    assert_eq!(config.server.port, 4100);
}

#[test]
fn load_from_path_reports_unknown_key() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[webhook]\ndedup_tll_secs = 10").unwrap();

    let errors = load_and_validate_path(file.path()).unwrap_err();
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "dedup_tll_secs");
            assert_eq!(suggestion.as_deref(), Some("dedup_ttl_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}
