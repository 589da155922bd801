// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only conversation messages.

use chrono::{DateTime, Utc};
use rusqlite::params;
use switchboard_core::SwitchboardError;
use switchboard_core::types::NewMessage;

use crate::database::{Database, map_tr_err};
use crate::models::{MESSAGE_COLUMNS, Message, message_from_row, ts};

/// Appends a message and returns it with its assigned id.
pub async fn insert_message(
    db: &Database,
    msg: NewMessage,
    now: DateTime<Utc>,
) -> Result<Message, SwitchboardError> {
    let id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| -> Result<Message, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "INSERT INTO messages (id, tenant_id, conversation_id, direction, text, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                params![
                    id,
                    msg.tenant_id,
                    msg.conversation_id,
                    msg.direction.to_string(),
                    msg.text,
                    ts(now),
                ],
                message_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in chronological order, optionally limited.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT ?2"
            ))?;
            // SQLite treats a negative LIMIT as unbounded.
            let rows = stmt.query_map(
                params![conversation_id, limit.unwrap_or(-1)],
                message_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations;
    use switchboard_core::Direction;
    use tempfile::tempdir;

    async fn setup() -> (Database, String, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let conv = conversations::create(&db, "t1", "amber-fox", Utc::now())
            .await
            .unwrap();
        (db, conv.id, dir)
    }

    fn new_message(conversation_id: &str, direction: Direction, text: &str) -> NewMessage {
        NewMessage {
            tenant_id: "t1".into(),
            conversation_id: conversation_id.into(),
            direction,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn insert_and_list_in_order() {
        let (db, conv, _dir) = setup().await;
        let now = Utc::now();
        insert_message(&db, new_message(&conv, Direction::Inbound, "hello"), now)
            .await
            .unwrap();
        insert_message(&db, new_message(&conv, Direction::Outbound, "hi back"), now)
            .await
            .unwrap();

        let messages = get_messages_for_conversation(&db, &conv, None).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].direction, Direction::Inbound);
        assert_eq!(messages[1].text, "hi back");
        assert_eq!(messages[1].direction, Direction::Outbound);
    }

    #[tokio::test]
    async fn limit_truncates() {
        let (db, conv, _dir) = setup().await;
        for i in 0..5 {
            insert_message(
                &db,
                new_message(&conv, Direction::Inbound, &format!("m{i}")),
                Utc::now(),
            )
            .await
            .unwrap();
        }
        let messages = get_messages_for_conversation(&db, &conv, Some(3)).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "m0");
    }

    #[tokio::test]
    async fn unknown_conversation_is_rejected() {
        let (db, _conv, _dir) = setup().await;
        let result =
            insert_message(&db, new_message("missing", Direction::Inbound, "x"), Utc::now()).await;
        assert!(result.is_err(), "foreign key should reject unknown conversation");
    }
}
