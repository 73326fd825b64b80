//! Messaging transport seam.
//!
//! The transport owns delivery, retries and connection liveness. The
//! coordinator only hands it opaque payloads; inbound traffic comes back
//! through `Coordinator::handle_message` and `Coordinator::on_disconnect`,
//! and the coordinator asks it to `close` connections it has evicted.

use async_trait::async_trait;
use thiserror::Error;

use super::value_object::{ParticipantId, RoomName};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("participant {0} is not reachable")]
    Unreachable(ParticipantId),
}

/// Reliable, ordered delivery to named participants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Deliver a payload to one participant.
    async fn send_to(&self, participant: ParticipantId, payload: Vec<u8>)
    -> Result<(), TransportError>;

    /// Deliver a payload to every recipient in a room.
    ///
    /// Recipients that cannot be reached are skipped; the error reports the
    /// first of them.
    async fn broadcast(
        &self,
        room: &RoomName,
        recipients: &[ParticipantId],
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Drop the participant's connection after the coordinator evicted it.
    ///
    /// Payloads already handed over are still flushed. Closing an unknown
    /// participant does nothing.
    async fn close(&self, participant: ParticipantId);
}
