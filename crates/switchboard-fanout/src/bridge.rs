// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`FanoutBridge`] implementations.
//!
//! [`LocalBridge`] delivers to this process only. [`SharedBridge`] relays
//! every publish through a [`BroadcastMedium`]; each process runs one
//! subscriber task that feeds received events into its own [`LocalHub`],
//! so the publishing process is served by its own subscriber as well.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use switchboard_core::{
    BroadcastEnvelope, BroadcastMedium, BroadcastSubscription, FanoutBridge, FanoutPayload,
    SwitchboardError,
};
use switchboard_prometheus::DeliveryMetrics;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::LocalHub;

/// Channel prefix for conversation events on the shared medium.
pub const CHANNEL_PREFIX: &str = "conv:";

/// Pause before polling again after a subscription error.
const SUBSCRIBE_RETRY: Duration = Duration::from_secs(1);

/// Shared-medium channel name for a conversation.
pub fn channel_for(conversation_id: &str) -> String {
    format!("{CHANNEL_PREFIX}{conversation_id}")
}

/// Body of a bridged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BridgedEvent {
    conversation_id: String,
    payload: FanoutPayload,
}

/// Single-process bridge: publish is a local hub publish.
pub struct LocalBridge {
    hub: Arc<LocalHub>,
    metrics: Arc<DeliveryMetrics>,
}

impl LocalBridge {
    pub fn new(hub: Arc<LocalHub>, metrics: Arc<DeliveryMetrics>) -> Self {
        Self { hub, metrics }
    }
}

#[async_trait]
impl FanoutBridge for LocalBridge {
    async fn publish(&self, conversation_id: &str, payload: &FanoutPayload) {
        let delivered = self.hub.publish_local(conversation_id, payload);
        self.metrics.fanout_published();
        debug!(conversation_id, delivered, "fanout published locally");
    }
}

/// Bridge over a medium shared by every instance.
pub struct SharedBridge {
    hub: Arc<LocalHub>,
    medium: Arc<dyn BroadcastMedium>,
    metrics: Arc<DeliveryMetrics>,
    cancel: CancellationToken,
    subscriber: JoinHandle<()>,
}

impl SharedBridge {
    /// Subscribes to `medium` and spawns the forwarding task.
    ///
    /// The subscription is open before this returns, so every publish made
    /// afterwards reaches this process's hub.
    pub async fn start(
        hub: Arc<LocalHub>,
        medium: Arc<dyn BroadcastMedium>,
        metrics: Arc<DeliveryMetrics>,
        cancel: CancellationToken,
    ) -> Result<Self, SwitchboardError> {
        let subscription = medium.subscribe().await?;
        let cancel = cancel.child_token();
        let subscriber = tokio::spawn(forward_events(
            subscription,
            Arc::clone(&hub),
            cancel.clone(),
        ));
        info!("shared fanout bridge started");
        Ok(Self {
            hub,
            medium,
            metrics,
            cancel,
            subscriber,
        })
    }

    /// Stops the subscriber task and waits for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.subscriber.await {
            warn!(error = %e, "fanout subscriber task panicked");
        }
    }
}

#[async_trait]
impl FanoutBridge for SharedBridge {
    async fn publish(&self, conversation_id: &str, payload: &FanoutPayload) {
        self.metrics.fanout_published();
        let event = BridgedEvent {
            conversation_id: conversation_id.to_string(),
            payload: payload.clone(),
        };
        let result = match serde_json::to_string(&event) {
            Ok(body) => {
                self.medium
                    .publish(&channel_for(conversation_id), &body)
                    .await
            }
            Err(e) => Err(SwitchboardError::from(e)),
        };
        if let Err(e) = result {
            self.metrics.fanout_bridge_error();
            let delivered = self.hub.publish_local(conversation_id, payload);
            warn!(
                conversation_id,
                delivered,
                error = %e,
                "shared fanout publish failed, delivered locally only"
            );
        }
    }
}

async fn forward_events(
    mut subscription: Box<dyn BroadcastSubscription>,
    hub: Arc<LocalHub>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = subscription.next() => next,
        };
        match next {
            Ok(Some(envelope)) => forward(&hub, envelope),
            Ok(None) => {
                info!("broadcast medium closed, fanout subscriber exiting");
                break;
            }
            Err(e) => {
                warn!(error = %e, "fanout subscription failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(SUBSCRIBE_RETRY) => {}
                }
            }
        }
    }
    debug!("fanout subscriber stopped");
}

fn forward(hub: &LocalHub, envelope: BroadcastEnvelope) {
    if !envelope.channel.starts_with(CHANNEL_PREFIX) {
        return;
    }
    match serde_json::from_str::<BridgedEvent>(&envelope.body) {
        Ok(event) => {
            let delivered = hub.publish_local(&event.conversation_id, &event.payload);
            debug!(
                conversation_id = %event.conversation_id,
                delivered,
                "bridged fanout delivered"
            );
        }
        Err(e) => {
            warn!(channel = %envelope.channel, error = %e, "dropping malformed bridged event");
        }
    }
}
