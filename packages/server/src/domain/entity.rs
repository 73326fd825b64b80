//! Core domain models: participants and rooms.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{
    chat::{ChatLog, ChatMessage, ChatPolicy, History},
    error::{RoomError, ValueObjectError},
    readiness::{ReadinessState, ReadyTransition, RoomPhase},
    value_object::{DisplayName, MessageText, ParticipantId, RoomName, Timestamp},
};

/// Default time an empty room survives before it is destroyed
pub const DEFAULT_EMPTY_ROOM_TTL: Duration = Duration::from_millis(1000);

/// Connection state of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Liveness {
    Connected,
    Disconnected,
}

/// A connected client known to the coordinator
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: DisplayName,
    pub liveness: Liveness,
    /// Last time the participant was heard from (monotonic)
    pub last_seen: Instant,
    pub connected_at: Timestamp,
    /// The room the participant occupies or is being admitted to
    pub room: Option<RoomName>,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        display_name: DisplayName,
        now: Instant,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name,
            liveness: Liveness::Connected,
            last_seen: now,
            connected_at,
            room: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// Whether the participant has been silent for at least `timeout`.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= timeout
    }
}

/// A room member, in join order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: ParticipantId,
    pub display_name: DisplayName,
    pub joined_at: Timestamp,
}

impl Member {
    pub fn new(id: ParticipantId, display_name: DisplayName, joined_at: Timestamp) -> Self {
        Self {
            id,
            display_name,
            joined_at,
        }
    }
}

/// Settings fixed when a room is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomOptions {
    pub capacity: usize,
    pub empty_ttl: Duration,
}

impl RoomOptions {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            empty_ttl: DEFAULT_EMPTY_ROOM_TTL,
        }
    }

    pub fn with_empty_ttl(mut self, empty_ttl: Duration) -> Self {
        self.empty_ttl = empty_ttl;
        self
    }
}

/// Listing entry for a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: RoomName,
    pub member_count: usize,
    pub capacity: usize,
    pub open: bool,
    pub phase: RoomPhase,
}

/// A member as seen from outside the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberState {
    pub id: ParticipantId,
    pub display_name: DisplayName,
    pub ready: bool,
    pub joined_at: Timestamp,
}

/// Point-in-time view of a room, carried by events and `room-state` messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub name: RoomName,
    pub capacity: usize,
    pub open: bool,
    pub phase: RoomPhase,
    /// Members in join order
    pub members: Vec<MemberState>,
}

impl RoomSnapshot {
    pub fn member_ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|m| m.id).collect()
    }
}

/// Represents a room with its members, readiness and chat history.
///
/// Membership and readiness are only changed together, so every member has
/// exactly one readiness entry. Every rejected call leaves the room untouched.
#[derive(Debug, Clone)]
pub struct Room {
    name: RoomName,
    capacity: usize,
    members: Vec<Member>,
    open: bool,
    empty_ttl: Duration,
    empty_since: Option<Instant>,
    created_at: Timestamp,
    readiness: ReadinessState,
    chat: ChatLog,
}

impl Room {
    /// Create an empty, open room. Its empty-room TTL starts counting immediately.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::InvalidCapacity` if the capacity is zero
    pub fn new(
        name: RoomName,
        options: RoomOptions,
        chat_policy: ChatPolicy,
        now: Instant,
        created_at: Timestamp,
    ) -> Result<Self, RoomError> {
        if options.capacity < 1 {
            return Err(RoomError::InvalidCapacity(options.capacity));
        }
        Ok(Self {
            name,
            capacity: options.capacity,
            members: Vec::new(),
            open: true,
            empty_ttl: options.empty_ttl,
            empty_since: Some(now),
            created_at,
            readiness: ReadinessState::new(),
            chat: ChatLog::new(chat_policy),
        })
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|m| m.id).collect()
    }

    pub fn is_member(&self, participant: ParticipantId) -> bool {
        self.members.iter().any(|m| m.id == participant)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn empty_ttl(&self) -> Duration {
        self.empty_ttl
    }

    pub fn phase(&self) -> RoomPhase {
        self.readiness.phase(self.capacity)
    }

    pub fn is_ready(&self, participant: ParticipantId) -> Option<bool> {
        self.readiness.get(participant)
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Whether the room has been empty for at least its TTL.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.members.is_empty()
            && self
                .empty_since
                .is_some_and(|since| now.saturating_duration_since(since) >= self.empty_ttl)
    }

    /// Admit a new member at the end of the join order.
    ///
    /// The member starts not ready, unless it is the first member and
    /// `creator_auto_ready` is set. Admission can complete the room, so the
    /// returned transition may carry the start.
    ///
    /// # Errors
    ///
    /// * `RoomError::Closed` if the open flag is false (started rooms are closed)
    /// * `RoomError::Full` if the room is at capacity
    /// * `RoomError::AlreadyInRoom` if the participant is already a member
    pub fn admit(
        &mut self,
        member: Member,
        creator_auto_ready: bool,
    ) -> Result<ReadyTransition, RoomError> {
        if !self.open {
            return Err(RoomError::Closed(self.name.clone()));
        }
        if self.members.len() >= self.capacity {
            return Err(RoomError::Full {
                name: self.name.clone(),
                capacity: self.capacity,
            });
        }
        if self.is_member(member.id) {
            return Err(RoomError::AlreadyInRoom(self.name.clone()));
        }

        let ready = creator_auto_ready && self.members.is_empty();
        self.readiness.track(member.id, ready);
        self.members.push(member);
        self.empty_since = None;

        Ok(self.settle(true))
    }

    /// Remove a member. Idempotent: returns `None` if it was not a member.
    ///
    /// The member's readiness entry and chat cooldown go with it. An emptied
    /// room starts its TTL countdown at `now`.
    pub fn remove(&mut self, participant: ParticipantId, now: Instant) -> Option<Member> {
        let index = self.members.iter().position(|m| m.id == participant)?;
        let member = self.members.remove(index);
        self.readiness.forget(participant);
        self.chat.cancel_cooldown(participant);
        if self.members.is_empty() {
            self.empty_since = Some(now);
        }
        Some(member)
    }

    /// Set a member's readiness flag and re-evaluate the aggregate.
    ///
    /// # Errors
    ///
    /// * `RoomError::NotAMember` if the participant is not in the room
    /// * `RoomError::AlreadyStarted` if the room has started
    pub fn set_ready(
        &mut self,
        participant: ParticipantId,
        ready: bool,
    ) -> Result<ReadyTransition, RoomError> {
        let changed = self.readiness.set(participant, ready)?;
        Ok(self.settle(changed))
    }

    /// Post a chat message from a member.
    ///
    /// # Errors
    ///
    /// * `RoomError::NotAMember` if the sender is not in the room
    /// * `RoomError::EmptyMessage` if the text is blank after trimming
    /// * `RoomError::MessageTooLong` if the text exceeds the length limit
    /// * `RoomError::RateLimited` if the sender posted within the cooldown
    pub fn post(
        &mut self,
        sender: ParticipantId,
        text: &str,
        now: Instant,
        posted_at: Timestamp,
    ) -> Result<ChatMessage, RoomError> {
        let sender_name = self
            .members
            .iter()
            .find(|m| m.id == sender)
            .map(|m| m.display_name.clone())
            .ok_or(RoomError::NotAMember(sender))?;
        let text = MessageText::new(text).map_err(|e| match e {
            ValueObjectError::MessageTextTooLong { max, actual } => {
                RoomError::MessageTooLong { max, actual }
            }
            _ => RoomError::EmptyMessage,
        })?;
        self.chat.append(sender, sender_name, text, now, posted_at)
    }

    pub fn history(&self) -> History {
        self.chat.history()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            member_count: self.members.len(),
            capacity: self.capacity,
            open: self.open,
            phase: self.phase(),
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            name: self.name.clone(),
            capacity: self.capacity,
            open: self.open,
            phase: self.phase(),
            members: self
                .members
                .iter()
                .map(|m| MemberState {
                    id: m.id,
                    display_name: m.display_name.clone(),
                    ready: self.readiness.get(m.id).unwrap_or(false),
                    joined_at: m.joined_at,
                })
                .collect(),
        }
    }

    // Starting closes the room to late joiners.
    fn settle(&mut self, changed: bool) -> ReadyTransition {
        let start = self.readiness.try_start(self.capacity);
        if start {
            self.open = false;
        }
        ReadyTransition {
            changed,
            phase: self.phase(),
            start,
        }
    }
}
