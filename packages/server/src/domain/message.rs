//! Logical message kinds exchanged with clients over the transport.
//!
//! Only the kinds and their fields are defined here; the byte encoding lives
//! in `infrastructure::codec`.

use serde::{Deserialize, Serialize};

use super::{
    chat::ChatMessage,
    entity::RoomSnapshot,
    value_object::{DisplayName, ParticipantId, RoomName},
};

/// Messages a client sends to the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join the named room, creating it when missing. Without a name a new
    /// room with a generated code is created.
    JoinRequest {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        capacity: Option<usize>,
        /// Empty-room TTL for a room this request creates
        #[serde(default)]
        empty_ttl_ms: Option<u64>,
    },
    LeaveRequest,
    ReadyToggle { ready: bool },
    ChatPost { text: String },
    Heartbeat,
}

/// Messages the coordinator sends to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        participant: ParticipantId,
        display_name: DisplayName,
    },
    RoomState { room: RoomSnapshot },
    ChatPost { room: RoomName, message: ChatMessage },
    StartSignal {
        room: RoomName,
        members: Vec<ParticipantId>,
    },
    Rejected { reason: String },
}
