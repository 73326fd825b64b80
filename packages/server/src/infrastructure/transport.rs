//! WebSocket-backed messaging transport.
//!
//! Each connected socket registers an unbounded channel; a per-connection
//! task drains it into the socket, so delivery order per participant is the
//! order of `send_to` / `broadcast` calls.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::domain::{MessagingTransport, ParticipantId, RoomName, TransportError};

/// Outbound payload channels of connected sockets, keyed by participant
#[derive(Clone, Default)]
pub struct WebSocketTransport {
    clients: Arc<Mutex<HashMap<ParticipantId, mpsc::UnboundedSender<Vec<u8>>>>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning the receiving end of its outbound channel.
    pub async fn register(&self, participant: ParticipantId) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut clients = self.clients.lock().await;
        clients.insert(participant, tx);
        rx
    }

    /// Drop a connection's outbound channel. The socket task sees the channel
    /// close once queued payloads are drained.
    pub async fn unregister(&self, participant: ParticipantId) {
        let mut clients = self.clients.lock().await;
        clients.remove(&participant);
    }

    pub async fn connected_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl MessagingTransport for WebSocketTransport {
    async fn send_to(
        &self,
        participant: ParticipantId,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        let clients = self.clients.lock().await;
        clients
            .get(&participant)
            .and_then(|sender| sender.send(payload).ok())
            .ok_or(TransportError::Unreachable(participant))
    }

    async fn broadcast(
        &self,
        room: &RoomName,
        recipients: &[ParticipantId],
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        let clients = self.clients.lock().await;
        let mut first_failure = None;
        for &participant in recipients {
            let delivered = clients
                .get(&participant)
                .is_some_and(|sender| sender.send(payload.clone()).is_ok());
            if !delivered {
                tracing::warn!(%participant, %room, "failed to deliver broadcast");
                first_failure.get_or_insert(participant);
            }
        }
        match first_failure {
            Some(participant) => Err(TransportError::Unreachable(participant)),
            None => Ok(()),
        }
    }

    async fn close(&self, participant: ParticipantId) {
        self.unregister(participant).await;
    }
}
