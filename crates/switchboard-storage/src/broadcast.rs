// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`BroadcastMedium`] backed by the `broadcast_events` table.
//!
//! Every process that opens the same database file sees every event: a
//! subscription remembers the last sequence number it delivered and polls
//! for newer rows. Old rows are pruned after the retention window.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use switchboard_core::{BroadcastEnvelope, BroadcastMedium, BroadcastSubscription, SwitchboardError};
use tracing::{debug, warn};

use crate::database::Database;
use crate::models::chrono_duration;
use crate::queries::broadcast;

/// Rows fetched per poll.
const READ_BATCH: i64 = 256;

/// Publishes between prune passes.
const PRUNE_EVERY: u64 = 64;

/// Table-backed shared pub/sub medium.
pub struct SqliteBroadcast {
    db: Database,
    poll_interval: Duration,
    retention: Duration,
    published: AtomicU64,
}

impl SqliteBroadcast {
    pub fn new(db: Database, poll_interval: Duration, retention: Duration) -> Self {
        Self {
            db,
            poll_interval,
            retention,
            published: AtomicU64::new(0),
        }
    }

    /// Deletes events older than the retention window.
    pub async fn prune(&self) -> Result<usize, SwitchboardError> {
        let cutoff = Utc::now() - chrono_duration(self.retention);
        let removed = broadcast::prune_before(&self.db, cutoff).await?;
        if removed > 0 {
            debug!(removed, "pruned broadcast events");
        }
        Ok(removed)
    }
}

#[async_trait]
impl BroadcastMedium for SqliteBroadcast {
    async fn publish(&self, channel: &str, body: &str) -> Result<(), SwitchboardError> {
        broadcast::append(&self.db, channel, body, Utc::now()).await?;
        if self.published.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1
            && let Err(e) = self.prune().await
        {
            warn!(error = %e, "broadcast prune failed");
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn BroadcastSubscription>, SwitchboardError> {
        let cursor = broadcast::head(&self.db).await?;
        Ok(Box::new(SqliteSubscription {
            db: self.db.clone(),
            cursor,
            poll_interval: self.poll_interval,
            pending: VecDeque::new(),
        }))
    }
}

/// Tails `broadcast_events` from the head observed at subscribe time.
struct SqliteSubscription {
    db: Database,
    cursor: i64,
    poll_interval: Duration,
    pending: VecDeque<BroadcastEnvelope>,
}

#[async_trait]
impl BroadcastSubscription for SqliteSubscription {
    async fn next(&mut self) -> Result<Option<BroadcastEnvelope>, SwitchboardError> {
        loop {
            if let Some(envelope) = self.pending.pop_front() {
                return Ok(Some(envelope));
            }
            let batch = broadcast::read_after(&self.db, self.cursor, READ_BATCH).await?;
            if batch.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            for (seq, envelope) in batch {
                self.cursor = seq;
                self.pending.push_back(envelope);
            }
        }
    }
}
