// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant channel configuration lookups.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use switchboard_core::{ChannelConfig, SwitchboardError};

use crate::database::{Database, map_tr_err};
use crate::models::ts;

const CHANNEL_COLUMNS: &str =
    "tenant_id, webhook_secret, bot_token, destination_id, header_secret, default_thread_id";

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelConfig> {
    Ok(ChannelConfig {
        tenant_id: row.get(0)?,
        webhook_secret: row.get(1)?,
        bot_token: row.get(2)?,
        destination_id: row.get(3)?,
        header_secret: row.get(4)?,
        default_thread_id: row.get(5)?,
    })
}

/// Inserts or replaces the configuration for `config.tenant_id`.
pub async fn upsert(
    db: &Database,
    config: &ChannelConfig,
    now: DateTime<Utc>,
) -> Result<(), SwitchboardError> {
    let config = config.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO channels (tenant_id, webhook_secret, bot_token, destination_id,
                                       header_secret, default_thread_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (tenant_id) DO UPDATE SET
                     webhook_secret = excluded.webhook_secret,
                     bot_token = excluded.bot_token,
                     destination_id = excluded.destination_id,
                     header_secret = excluded.header_secret,
                     default_thread_id = excluded.default_thread_id,
                     updated_at = excluded.updated_at",
                params![
                    config.tenant_id,
                    config.webhook_secret,
                    config.bot_token,
                    config.destination_id,
                    config.header_secret,
                    config.default_thread_id,
                    ts(now),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Looks a channel up by the secret embedded in its webhook path.
pub async fn by_webhook_secret(
    db: &Database,
    secret: &str,
) -> Result<Option<ChannelConfig>, SwitchboardError> {
    let secret = secret.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ChannelConfig>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE webhook_secret = ?1"),
                params![secret],
                channel_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Looks a channel up by tenant.
pub async fn for_tenant(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<ChannelConfig>, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ChannelConfig>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE tenant_id = ?1"),
                params![tenant_id],
                channel_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(tenant: &str, secret: &str) -> ChannelConfig {
        ChannelConfig {
            tenant_id: tenant.into(),
            webhook_secret: secret.into(),
            bot_token: "123:ABC".into(),
            destination_id: "-1001".into(),
            header_secret: None,
            default_thread_id: Some(9),
        }
    }

    #[tokio::test]
    async fn upsert_then_lookup_both_ways() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap())
            .await
            .unwrap();
        upsert(&db, &config("t1", "s1"), Utc::now()).await.unwrap();

        let by_secret = by_webhook_secret(&db, "s1").await.unwrap().unwrap();
        assert_eq!(by_secret, config("t1", "s1"));
        let by_tenant = for_tenant(&db, "t1").await.unwrap().unwrap();
        assert_eq!(by_tenant, by_secret);

        assert!(by_webhook_secret(&db, "nope").await.unwrap().is_none());
        assert!(for_tenant(&db, "t9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_tenant() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap())
            .await
            .unwrap();
        upsert(&db, &config("t1", "s1"), Utc::now()).await.unwrap();
        upsert(&db, &config("t1", "s2"), Utc::now()).await.unwrap();

        assert!(by_webhook_secret(&db, "s1").await.unwrap().is_none());
        assert!(by_webhook_secret(&db, "s2").await.unwrap().is_some());
    }
}
