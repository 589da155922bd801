// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox operations: idempotent enqueue, leased claim, and completion.
//!
//! Every transition is a single conditional statement so concurrent workers
//! in any number of processes never observe the same claim.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use switchboard_core::types::{NewOutboxItem, OutboxItem};
use switchboard_core::SwitchboardError;

use crate::database::{Database, map_tr_err};
use crate::models::{OUTBOX_COLUMNS, chrono_duration, outbox_from_row, ts};

/// Inserts a PENDING item, or returns the existing row for the same
/// (`tenant_id`, `idempotency_key`) unchanged.
pub async fn enqueue(
    db: &Database,
    item: NewOutboxItem,
    now: DateTime<Utc>,
) -> Result<OutboxItem, SwitchboardError> {
    let payload = serde_json::to_string(&item.payload)?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<OutboxItem, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let inserted = tx.execute(
                "INSERT INTO outbox (id, tenant_id, type, payload, idempotency_key, status,
                                     attempts, next_attempt_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING', 0, ?6, ?6, ?6)
                 ON CONFLICT DO NOTHING",
                params![id, item.tenant_id, item.kind, payload, item.idempotency_key, now],
            )?;

            let row = if inserted == 1 {
                tx.query_row(
                    &format!("SELECT {OUTBOX_COLUMNS} FROM outbox WHERE id = ?1"),
                    params![id],
                    outbox_from_row,
                )?
            } else {
                tx.query_row(
                    &format!(
                        "SELECT {OUTBOX_COLUMNS} FROM outbox
                         WHERE tenant_id = ?1 AND idempotency_key = ?2"
                    ),
                    params![item.tenant_id, item.idempotency_key],
                    outbox_from_row,
                )?
            };
            tx.commit()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}

/// Claims the oldest eligible item with a lease of `lease`.
///
/// Eligible means PENDING and due, or PROCESSING with an expired lease. The
/// eligibility predicate is repeated on the outer `UPDATE`, so a worker that
/// loses a race updates zero rows and gets `None`.
pub async fn claim_next(
    db: &Database,
    now: DateTime<Utc>,
    lease: Duration,
) -> Result<Option<OutboxItem>, SwitchboardError> {
    let locked_until = ts(now + chrono_duration(lease));
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<Option<OutboxItem>, rusqlite::Error> {
            // Write lock up front: under WAL a read-to-write upgrade fails
            // with SQLITE_BUSY instead of waiting on busy_timeout.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let claimed = tx.query_row(
                &format!(
                    "UPDATE outbox
                     SET status = 'PROCESSING', locked_until = ?2, updated_at = ?1
                     WHERE id = (
                         SELECT id FROM outbox
                         WHERE (status = 'PENDING' AND next_attempt_at <= ?1)
                            OR (status = 'PROCESSING' AND locked_until <= ?1)
                         ORDER BY created_at ASC, id ASC
                         LIMIT 1
                     )
                     AND ((status = 'PENDING' AND next_attempt_at <= ?1)
                          OR (status = 'PROCESSING' AND locked_until <= ?1))
                     RETURNING {OUTBOX_COLUMNS}"
                ),
                params![now, locked_until],
                outbox_from_row,
            )
            .optional()?;
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Marks an item DONE and releases its lease.
pub async fn mark_done(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<(), SwitchboardError> {
    let id = id.to_string();
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE outbox SET status = 'DONE', locked_until = NULL, updated_at = ?2
                 WHERE id = ?1 AND status != 'DONE'",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Returns an item to PENDING, recording the attempt and scheduling a retry.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error: &str,
    backoff: Duration,
    now: DateTime<Utc>,
) -> Result<(), SwitchboardError> {
    let id = id.to_string();
    let error = error.to_string();
    let next_attempt_at = ts(now + chrono_duration(backoff));
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE outbox
                 SET status = 'PENDING', attempts = attempts + 1, last_error = ?2,
                     next_attempt_at = ?3, locked_until = NULL, updated_at = ?4
                 WHERE id = ?1 AND status != 'DONE'",
                params![id, error, next_attempt_at, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Parks an item as DEAD, recording the final attempt.
pub async fn mark_dead(
    db: &Database,
    id: &str,
    error: &str,
    now: DateTime<Utc>,
) -> Result<(), SwitchboardError> {
    let id = id.to_string();
    let error = error.to_string();
    let now = ts(now);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE outbox
                 SET status = 'DEAD', attempts = attempts + 1, last_error = ?2,
                     locked_until = NULL, updated_at = ?3
                 WHERE id = ?1 AND status != 'DONE'",
                params![id, error, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Reads an item by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<OutboxItem>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<OutboxItem>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {OUTBOX_COLUMNS} FROM outbox WHERE id = ?1"),
                params![id],
                outbox_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
