// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! Within one process every statement runs on tokio-rusqlite's single
//! background thread, so a [`Database`] handle is the process's only writer.
//! Across processes, writes sharing the same file are serialized by SQLite
//! (WAL plus `busy_timeout`).

use std::time::Duration;

use switchboard_core::SwitchboardError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Connection options applied when a database is opened.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub wal_mode: bool,
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            wal_mode: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Cloneable handle to the single-writer connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens `path` with default options and applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, SwitchboardError> {
        Self::open_with(path, &OpenOptions::default()).await
    }

    /// Opens `path`, applies PRAGMAs, and runs pending migrations.
    pub async fn open_with(path: &str, options: &OpenOptions) -> Result<Self, SwitchboardError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SwitchboardError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SwitchboardError::Storage {
                source: Box::new(e),
            })?;

        let wal_mode = options.wal_mode;
        let busy_timeout = options.busy_timeout;
        conn.call(move |conn| -> Result<(), SwitchboardError> {
            conn.busy_timeout(busy_timeout).map_err(storage_err)?;
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })
                .map_err(storage_err)?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )
            .map_err(storage_err)?;
            run_migrations(conn)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => SwitchboardError::Storage {
                source: Box::new(other),
            },
        })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), SwitchboardError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(|e| SwitchboardError::Storage {
            source: Box::new(e),
        })
    }
}

/// Truncating WAL checkpoint.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), SwitchboardError> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
    })
    .await
    .map_err(map_tr_err)
}

fn storage_err(e: rusqlite::Error) -> SwitchboardError {
    SwitchboardError::Storage {
        source: Box::new(e),
    }
}

/// Maps a tokio-rusqlite call error into the storage error variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SwitchboardError {
    SwitchboardError::Storage {
        source: Box::new(e),
    }
}
