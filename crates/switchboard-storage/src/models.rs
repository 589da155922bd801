// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite columns and the domain types in
//! `switchboard-core`.
//!
//! Timestamps are stored as fixed-width UTC strings so that SQL comparisons
//! (`next_attempt_at <= ?`, `expires_at > ?`) are chronological.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub use switchboard_core::types::{Conversation, Message, OutboxItem};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats a timestamp for storage.
pub fn ts(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp.
pub fn parse_ts(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Converts a configured interval for timestamp arithmetic.
pub(crate) fn chrono_duration(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| conversion_err(idx, e))
}

fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse_ts(&raw).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

pub(crate) const OUTBOX_COLUMNS: &str = "id, tenant_id, type, payload, idempotency_key, status, \
     attempts, next_attempt_at, locked_until, last_error, created_at, updated_at";

/// Maps a row selected with [`OUTBOX_COLUMNS`].
pub(crate) fn outbox_from_row(row: &Row<'_>) -> rusqlite::Result<OutboxItem> {
    let payload: String = row.get(3)?;
    Ok(OutboxItem {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        kind: row.get(2)?,
        payload: serde_json::from_str(&payload).map_err(|e| conversion_err(3, e))?,
        idempotency_key: row.get(4)?,
        status: get_enum(row, 5)?,
        attempts: row.get(6)?,
        next_attempt_at: get_ts(row, 7)?,
        locked_until: get_opt_ts(row, 8)?,
        last_error: row.get(9)?,
        created_at: get_ts(row, 10)?,
        updated_at: get_ts(row, 11)?,
    })
}

pub(crate) const CONVERSATION_COLUMNS: &str =
    "id, tenant_id, kind, thread_id, codename, created_at, last_customer_at, last_operator_at";

/// Maps a row selected with [`CONVERSATION_COLUMNS`].
pub(crate) fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        kind: get_enum(row, 2)?,
        thread_id: row.get(3)?,
        codename: row.get(4)?,
        created_at: get_ts(row, 5)?,
        last_customer_at: get_opt_ts(row, 6)?,
        last_operator_at: get_opt_ts(row, 7)?,
    })
}

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, tenant_id, conversation_id, direction, text, created_at";

/// Maps a row selected with [`MESSAGE_COLUMNS`].
pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        conversation_id: row.get(2)?,
        direction: get_enum(row, 3)?,
        text: row.get(4)?,
        created_at: get_ts(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::milliseconds(1);
        assert!(ts(early) < ts(late));
        assert_eq!(ts(early), "2026-01-02T03:04:05.000Z");
    }

    #[test]
    fn timestamp_parse_inverts_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(parse_ts(&ts(at)).unwrap(), at);
    }
}
