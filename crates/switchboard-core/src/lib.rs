// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard support-channel service.
//!
//! This crate provides the trait definitions, error types, and domain types
//! shared by the storage, channel, fanout, delivery, and gateway crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SwitchboardError;
pub use types::{
    AdapterType, BroadcastEnvelope, CHANNEL_SEND, ChannelConfig, ChannelSendPayload, Conversation,
    ConversationKind, Direction, FanoutPayload, HealthStatus, Message, NewMessage, NewOutboxItem,
    OutboxItem, OutboxStatus, ROOT_THREAD_ID, RealtimeClaims,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    BroadcastMedium, BroadcastSubscription, ChannelAdapter, ChannelDirectory, FanoutBridge,
    PluginAdapter, StorageAdapter, TokenVerifier,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switchboard_error_variants_construct() {
        let _config = SwitchboardError::Config("test".into());
        let _storage = SwitchboardError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let channel = SwitchboardError::channel("boom");
        assert_eq!(channel.to_string(), "channel error: boom");
        let _limited = SwitchboardError::RateLimited {
            retry_after: std::time::Duration::from_secs(3),
        };
        let _not_found = SwitchboardError::NotFound("conv".into());
        let _unauth = SwitchboardError::Unauthorized("bad token".into());
        let _timeout = SwitchboardError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = SwitchboardError::Internal("test".into());
    }

    #[test]
    fn outbox_status_round_trips_through_strings() {
        use std::str::FromStr;

        for status in [
            OutboxStatus::Pending,
            OutboxStatus::Processing,
            OutboxStatus::Done,
            OutboxStatus::Dead,
        ] {
            let s = status.to_string();
            assert_eq!(s, s.to_uppercase());
            assert_eq!(OutboxStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&OutboxStatus::Pending).unwrap(),
            "\"PENDING\""
        );
    }

    #[test]
    fn direction_and_kind_wire_names() {
        assert_eq!(Direction::Inbound.to_string(), "INBOUND");
        assert_eq!(Direction::Outbound.to_string(), "OUTBOUND");
        assert_eq!(ConversationKind::Root.to_string(), "root");
        assert_eq!(ConversationKind::Customer.to_string(), "customer");
    }

    #[test]
    fn fanout_payload_serializes_as_frame() {
        let payload = FanoutPayload {
            direction: Direction::Outbound,
            text: "hi".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"direction": "OUTBOUND", "text": "hi"})
        );
    }

    #[test]
    fn channel_send_payload_omits_absent_thread() {
        let payload = ChannelSendPayload {
            destination: "-100".into(),
            text: "hi".into(),
            thread_id: None,
        };
        let item = NewOutboxItem::channel_send("t1", &payload, Some("k".into())).unwrap();
        assert_eq!(item.kind, CHANNEL_SEND);
        assert!(item.payload.get("thread_id").is_none());

        let parsed: ChannelSendPayload =
            serde_json::from_value(serde_json::json!({"destination": "-100", "text": "x"}))
                .unwrap();
        assert_eq!(parsed.thread_id, None);
    }

    #[test]
    fn channel_config_debug_redacts_secrets() {
        let config = ChannelConfig {
            tenant_id: "t1".into(),
            webhook_secret: "path-secret".into(),
            bot_token: "123:ABC".into(),
            destination_id: "-100".into(),
            header_secret: Some("hdr".into()),
            default_thread_id: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("path-secret"));
        assert!(!debug.contains("123:ABC"));
        assert!(!debug.contains("hdr"));
        assert!(debug.contains("t1"));
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_directory<T: ChannelDirectory>() {}
        fn _assert_bridge<T: FanoutBridge>() {}
        fn _assert_medium<T: BroadcastMedium>() {}
        fn _assert_verifier<T: TokenVerifier>() {}
    }
}
