// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only broadcast log shared by every process using the database.

use chrono::{DateTime, Utc};
use rusqlite::params;
use switchboard_core::{BroadcastEnvelope, SwitchboardError};

use crate::database::{Database, map_tr_err};
use crate::models::ts;

/// Appends an event and returns its sequence number.
pub async fn append(
    db: &Database,
    channel: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<i64, SwitchboardError> {
    let channel = channel.to_string();
    let body = body.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "INSERT INTO broadcast_events (channel, body, created_at)
                 VALUES (?1, ?2, ?3)
                 RETURNING seq",
                params![channel, body, ts(now)],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Highest sequence number written so far (0 when empty).
pub async fn head(db: &Database) -> Result<i64, SwitchboardError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM broadcast_events",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Events after `after_seq`, oldest first, at most `limit`.
pub async fn read_after(
    db: &Database,
    after_seq: i64,
    limit: i64,
) -> Result<Vec<(i64, BroadcastEnvelope)>, SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<Vec<(i64, BroadcastEnvelope)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT seq, channel, body FROM broadcast_events
                 WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![after_seq, limit], |row| {
                Ok((
                    row.get(0)?,
                    BroadcastEnvelope {
                        channel: row.get(1)?,
                        body: row.get(2)?,
                    },
                ))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes events created before `cutoff`. Returns the number removed.
pub async fn prune_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<usize, SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM broadcast_events WHERE created_at < ?1",
                params![ts(cutoff)],
            )
        })
        .await
        .map_err(map_tr_err)
}
