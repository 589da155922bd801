// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversations and their destination-thread binding.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use switchboard_core::SwitchboardError;

use crate::database::{Database, map_tr_err};
use crate::models::{CONVERSATION_COLUMNS, Conversation, conversation_from_row, ts};

/// Codename given to the tenant-wide root conversation.
pub const ROOT_CODENAME: &str = "root";

/// Creates a customer conversation with no thread.
pub async fn create(
    db: &Database,
    tenant_id: &str,
    codename: &str,
    now: DateTime<Utc>,
) -> Result<Conversation, SwitchboardError> {
    let id = uuid::Uuid::new_v4().to_string();
    let tenant_id = tenant_id.to_string();
    let codename = codename.to_string();
    db.connection()
        .call(move |conn| -> Result<Conversation, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "INSERT INTO conversations (id, tenant_id, kind, codename, created_at)
                     VALUES (?1, ?2, 'customer', ?3, ?4)
                     RETURNING {CONVERSATION_COLUMNS}"
                ),
                params![id, tenant_id, codename, ts(now)],
                conversation_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Reads a conversation by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Binds `thread_id` only when the conversation has none, then returns
/// whatever is bound afterwards. `None` means the conversation is missing.
pub async fn set_thread_if_unset(
    db: &Database,
    id: &str,
    thread_id: i64,
) -> Result<Option<i64>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.execute(
                "UPDATE conversations SET thread_id = ?2 WHERE id = ?1 AND thread_id IS NULL",
                params![id, thread_id],
            )?;
            let stored: Option<Option<i64>> = conn
                .query_row(
                    "SELECT thread_id FROM conversations WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(stored.flatten())
        })
        .await
        .map_err(map_tr_err)
}

/// Replaces (or clears) the bound thread unconditionally. Backs the
/// operator override that the admin surface exposes.
pub async fn override_thread(
    db: &Database,
    id: &str,
    thread_id: Option<i64>,
) -> Result<(), SwitchboardError> {
    let id = id.to_string();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE conversations SET thread_id = ?2 WHERE id = ?1",
                params![id.as_str(), thread_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(SwitchboardError::NotFound("conversation".to_string()));
    }
    Ok(())
}

/// Returns the tenant's conversation bound to `thread_id`, creating one
/// named `codename` if none exists. Concurrent callers converge on one row.
pub async fn find_or_create_by_thread(
    db: &Database,
    tenant_id: &str,
    thread_id: i64,
    codename: &str,
    now: DateTime<Utc>,
) -> Result<Conversation, SwitchboardError> {
    let id = uuid::Uuid::new_v4().to_string();
    let tenant_id = tenant_id.to_string();
    let codename = codename.to_string();
    db.connection()
        .call(move |conn| -> Result<Conversation, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO conversations (id, tenant_id, kind, thread_id, codename, created_at)
                 VALUES (?1, ?2, 'customer', ?3, ?4, ?5)",
                params![id, tenant_id, thread_id, codename, ts(now)],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE tenant_id = ?1 AND thread_id = ?2"
                ),
                params![tenant_id, thread_id],
                conversation_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Returns the tenant's root conversation, creating it on first use.
pub async fn find_or_create_root(
    db: &Database,
    tenant_id: &str,
    now: DateTime<Utc>,
) -> Result<Conversation, SwitchboardError> {
    let id = uuid::Uuid::new_v4().to_string();
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Conversation, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO conversations (id, tenant_id, kind, codename, created_at)
                 VALUES (?1, ?2, 'root', ?3, ?4)",
                params![id, tenant_id, ROOT_CODENAME, ts(now)],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE tenant_id = ?1 AND kind = 'root'"
                ),
                params![tenant_id],
                conversation_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Which activity column to stamp.
#[derive(Debug, Clone, Copy)]
pub enum Activity {
    Customer,
    Operator,
}

/// Stamps the last customer or operator activity time.
pub async fn touch(
    db: &Database,
    id: &str,
    activity: Activity,
    at: DateTime<Utc>,
) -> Result<(), SwitchboardError> {
    let id = id.to_string();
    let sql = match activity {
        Activity::Customer => "UPDATE conversations SET last_customer_at = ?2 WHERE id = ?1",
        Activity::Operator => "UPDATE conversations SET last_operator_at = ?2 WHERE id = ?1",
    };
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(sql, params![id, ts(at)])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
