//! HTTP API response DTOs.

use readyroom_shared::time::timestamp_to_rfc3339;
use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, History, MemberState, RoomPhase, RoomSnapshot, RoomSummary};

/// Room summary for list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub name: String,
    pub member_count: usize,
    pub capacity: usize,
    pub open: bool,
    pub phase: RoomPhase,
}

/// Room detail for detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub name: String,
    pub capacity: usize,
    pub open: bool,
    pub phase: RoomPhase,
    pub members: Vec<MemberDetailDto>,
}

/// Member detail for room detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDetailDto {
    pub id: u64,
    pub display_name: String,
    pub ready: bool,
    pub joined_at: String, // ISO 8601
}

/// Chat message for history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub sequence: u64,
    pub sender: u64,
    pub sender_name: String,
    pub text: String,
    pub posted_at: String, // ISO 8601
}

impl From<RoomSummary> for RoomSummaryDto {
    fn from(summary: RoomSummary) -> Self {
        Self {
            name: summary.name.into(),
            member_count: summary.member_count,
            capacity: summary.capacity,
            open: summary.open,
            phase: summary.phase,
        }
    }
}

impl From<MemberState> for MemberDetailDto {
    fn from(member: MemberState) -> Self {
        Self {
            id: member.id.value(),
            display_name: member.display_name.into(),
            ready: member.ready,
            joined_at: timestamp_to_rfc3339(member.joined_at.value()),
        }
    }
}

impl From<RoomSnapshot> for RoomDetailDto {
    fn from(snapshot: RoomSnapshot) -> Self {
        Self {
            name: snapshot.name.into(),
            capacity: snapshot.capacity,
            open: snapshot.open,
            phase: snapshot.phase,
            members: snapshot.members.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ChatMessage> for ChatMessageDto {
    fn from(message: ChatMessage) -> Self {
        Self {
            sequence: message.sequence.value(),
            sender: message.sender.value(),
            sender_name: message.sender_name.into(),
            text: message.text.into(),
            posted_at: timestamp_to_rfc3339(message.posted_at.value()),
        }
    }
}

impl ChatMessageDto {
    pub fn from_history(history: History) -> Vec<Self> {
        history.into_iter().map(Into::into).collect()
    }
}
