// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local registry of live viewer connections, keyed by
//! conversation id.

use dashmap::DashMap;
use switchboard_core::FanoutPayload;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// One live viewer: frames pushed into `tx` are written to its socket.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub tx: mpsc::Sender<String>,
}

impl Connection {
    /// A connection with a fresh id and a frame buffer of `capacity`.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx,
        };
        (connection, rx)
    }
}

/// Conversation id → live connections in this process.
#[derive(Debug, Default)]
pub struct LocalHub {
    connections: DashMap<String, Vec<Connection>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conversation_id: &str, connection: Connection) {
        debug!(conversation_id, connection_id = %connection.id, "viewer registered");
        self.connections
            .entry(conversation_id.to_string())
            .or_default()
            .push(connection);
    }

    pub fn unregister(&self, conversation_id: &str, connection_id: &str) {
        if let Some(mut set) = self.connections.get_mut(conversation_id) {
            set.retain(|c| c.id != connection_id);
        }
        self.connections
            .remove_if(conversation_id, |_, set| set.is_empty());
        debug!(conversation_id, connection_id, "viewer unregistered");
    }

    /// Pushes `payload` to every connection registered for the conversation
    /// and returns how many accepted it.
    ///
    /// Connections whose receiver is gone are pruned. A full buffer drops
    /// this frame for that viewer only.
    pub fn publish_local(&self, conversation_id: &str, payload: &FanoutPayload) -> usize {
        let frame = match serde_json::to_string(payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(conversation_id, error = %e, "failed to encode fanout frame");
                return 0;
            }
        };

        let mut delivered = 0;
        if let Some(mut set) = self.connections.get_mut(conversation_id) {
            set.retain(|connection| match connection.tx.try_send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        conversation_id,
                        connection_id = %connection.id,
                        "viewer buffer full, frame dropped"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
        }
        self.connections
            .remove_if(conversation_id, |_, set| set.is_empty());
        delivered
    }

    /// Live connections for a conversation.
    pub fn connection_count(&self, conversation_id: &str) -> usize {
        self.connections
            .get(conversation_id)
            .map_or(0, |set| set.len())
    }

    /// Conversations with at least one live connection.
    pub fn conversation_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::Direction;

    fn payload(text: &str) -> FanoutPayload {
        FanoutPayload {
            direction: Direction::Outbound,
            text: text.into(),
        }
    }

    #[test]
    fn publish_reaches_only_the_conversation() {
        let hub = LocalHub::new();
        let (a, mut rx_a) = Connection::new(8);
        let (b, mut rx_b) = Connection::new(8);
        hub.register("c1", a);
        hub.register("c2", b);

        assert_eq!(hub.publish_local("c1", &payload("hi")), 1);
        let frame = rx_a.try_recv().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&frame).unwrap(),
            serde_json::json!({"direction": "OUTBOUND", "text": "hi"})
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn publish_to_every_viewer_of_conversation() {
        let hub = LocalHub::new();
        let (a, mut rx_a) = Connection::new(8);
        let (b, mut rx_b) = Connection::new(8);
        hub.register("c1", a);
        hub.register("c1", b);

        assert_eq!(hub.publish_local("c1", &payload("hi")), 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn publish_without_viewers_is_zero() {
        let hub = LocalHub::new();
        assert_eq!(hub.publish_local("nobody", &payload("hi")), 0);
        assert_eq!(hub.conversation_count(), 0);
    }

    #[test]
    fn closed_connections_are_pruned() {
        let hub = LocalHub::new();
        let (a, rx_a) = Connection::new(8);
        let (b, _rx_b) = Connection::new(8);
        hub.register("c1", a);
        hub.register("c1", b);
        drop(rx_a);

        assert_eq!(hub.publish_local("c1", &payload("hi")), 1);
        assert_eq!(hub.connection_count("c1"), 1);
    }

    #[test]
    fn empty_sets_are_removed() {
        let hub = LocalHub::new();
        let (a, rx_a) = Connection::new(8);
        hub.register("c1", a);
        drop(rx_a);

        assert_eq!(hub.publish_local("c1", &payload("hi")), 0);
        assert_eq!(hub.conversation_count(), 0);
    }

    #[test]
    fn full_buffer_keeps_connection() {
        let hub = LocalHub::new();
        let (a, mut rx_a) = Connection::new(1);
        hub.register("c1", a);

        assert_eq!(hub.publish_local("c1", &payload("one")), 1);
        assert_eq!(hub.publish_local("c1", &payload("two")), 0);
        assert_eq!(hub.connection_count("c1"), 1);
        assert!(rx_a.try_recv().unwrap().contains("one"));
    }

    #[test]
    fn unregister_removes_connection_and_empty_set() {
        let hub = LocalHub::new();
        let (a, _rx) = Connection::new(8);
        let id = a.id.clone();
        hub.register("c1", a);
        hub.unregister("c1", &id);
        assert_eq!(hub.connection_count("c1"), 0);
        assert_eq!(hub.conversation_count(), 0);
        hub.unregister("c1", &id);
    }
}
