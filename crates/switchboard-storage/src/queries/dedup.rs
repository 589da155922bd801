// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived markers for upstream events that were already processed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{TransactionBehavior, params};
use switchboard_core::SwitchboardError;

use crate::database::{Database, map_tr_err};
use crate::models::{chrono_duration, ts};

/// Sets the marker for (`tenant_id`, `event_id`) unless a live one exists.
///
/// Returns `true` when this call set it. An expired marker is replaced.
pub async fn mark_if_absent(
    db: &Database,
    tenant_id: &str,
    event_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<bool, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let event_id = event_id.to_string();
    let expires_at = ts(now + chrono_duration(ttl));
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "DELETE FROM dedup_markers
                 WHERE tenant_id = ?1 AND event_id = ?2 AND expires_at <= ?3",
                params![tenant_id, event_id, now],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO dedup_markers (tenant_id, event_id, expires_at)
                 VALUES (?1, ?2, ?3)",
                params![tenant_id, event_id, expires_at],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes every expired marker. Returns the number removed.
pub async fn purge_expired(db: &Database, now: DateTime<Utc>) -> Result<usize, SwitchboardError> {
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM dedup_markers WHERE expires_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}
