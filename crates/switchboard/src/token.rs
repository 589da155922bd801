// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard token` command implementation.

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{RealtimeClaims, SwitchboardError};
use switchboard_gateway::HmacTokenVerifier;

/// Prints a signed real-time token for one conversation.
pub fn run_token(
    config: &SwitchboardConfig,
    tenant_id: String,
    conversation_id: String,
    ttl_secs: i64,
) -> Result<(), SwitchboardError> {
    let token = mint(config, tenant_id, conversation_id, ttl_secs, now_unix())?;
    println!("{token}");
    Ok(())
}

fn mint(
    config: &SwitchboardConfig,
    tenant_id: String,
    conversation_id: String,
    ttl_secs: i64,
    now_unix: i64,
) -> Result<String, SwitchboardError> {
    let secret = config.realtime.token_secret.as_deref().ok_or_else(|| {
        SwitchboardError::Config("realtime.token_secret is not configured".into())
    })?;
    if ttl_secs <= 0 {
        return Err(SwitchboardError::Config("token ttl must be positive".into()));
    }
    HmacTokenVerifier::new(secret).sign(&RealtimeClaims {
        tenant_id,
        conversation_id,
        exp: now_unix.saturating_add(ttl_secs),
    })
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
