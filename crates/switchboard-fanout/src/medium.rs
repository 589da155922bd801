// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process [`BroadcastMedium`] over a tokio broadcast channel.
//!
//! Several hubs bridged through one `InMemoryMedium` behave like separate
//! instances sharing a pub/sub service, which is what single-host tests need.

use async_trait::async_trait;
use switchboard_core::{BroadcastEnvelope, BroadcastMedium, BroadcastSubscription, SwitchboardError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct InMemoryMedium {
    tx: broadcast::Sender<BroadcastEnvelope>,
}

impl InMemoryMedium {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }
}

impl Default for InMemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastMedium for InMemoryMedium {
    async fn publish(&self, channel: &str, body: &str) -> Result<(), SwitchboardError> {
        // No subscribers is not an error: nobody is listening yet.
        let _ = self.tx.send(BroadcastEnvelope {
            channel: channel.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn BroadcastSubscription>, SwitchboardError> {
        Ok(Box::new(InMemorySubscription {
            rx: self.tx.subscribe(),
        }))
    }
}

struct InMemorySubscription {
    rx: broadcast::Receiver<BroadcastEnvelope>,
}

#[async_trait]
impl BroadcastSubscription for InMemorySubscription {
    async fn next(&mut self) -> Result<Option<BroadcastEnvelope>, SwitchboardError> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "broadcast subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return Ok(None),
            }
        }
    }
}
