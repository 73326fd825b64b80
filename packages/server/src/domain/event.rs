//! Observable coordinator events.
//!
//! Presentation and game-start logic subscribe to these instead of polling.

use super::{
    chat::ChatMessage,
    entity::RoomSnapshot,
    value_object::{DisplayName, ParticipantId, RoomName},
};

/// Why a room stopped existing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Empty for longer than its TTL
    Expired,
    /// Closed explicitly by the host
    Closed,
    /// A new room was created under the same name
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    RoomJoined {
        participant: ParticipantId,
        room: RoomSnapshot,
    },
    RoomLeft {
        participant: ParticipantId,
        room: RoomSnapshot,
    },
    ReadyChanged {
        participant: ParticipantId,
        ready: bool,
        room: RoomSnapshot,
    },
    /// Emitted exactly once per room instance
    GameStart { room: RoomSnapshot },
    ChatPosted {
        room: RoomName,
        message: ChatMessage,
    },
    ParticipantDisconnected {
        participant: ParticipantId,
        display_name: DisplayName,
    },
    RoomRemoved {
        room: RoomName,
        reason: RemovalReason,
    },
}

impl CoordinatorEvent {
    /// The room this event concerns, if any.
    pub fn room_name(&self) -> Option<&RoomName> {
        match self {
            Self::RoomJoined { room, .. }
            | Self::RoomLeft { room, .. }
            | Self::ReadyChanged { room, .. }
            | Self::GameStart { room } => Some(&room.name),
            Self::ChatPosted { room, .. } | Self::RoomRemoved { room, .. } => Some(room),
            Self::ParticipantDisconnected { .. } => None,
        }
    }
}
