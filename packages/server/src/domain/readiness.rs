//! Per-room readiness aggregation.
//!
//! A room moves through `Forming -> FullNotReady -> FullReady` as members
//! join and mark themselves ready. `FullReady` is promoted to the terminal
//! `Started` phase by [`ReadinessState::try_start`] inside the same mutation
//! that reached it, so a start is reported exactly once per room.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{error::RoomError, value_object::ParticipantId};

/// Aggregate readiness phase of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomPhase {
    /// Fewer members than capacity
    Forming,
    /// Full, at least one member not ready
    FullNotReady,
    /// Full and everyone ready; only observable transiently
    FullReady,
    /// Start signal emitted; terminal
    Started,
}

/// Result of a readiness-affecting mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyTransition {
    /// Whether any readiness flag actually changed
    pub changed: bool,
    /// Phase after the mutation
    pub phase: RoomPhase,
    /// True only for the mutation that started the room
    pub start: bool,
}

/// Readiness flags of one room, keyed by member.
#[derive(Debug, Clone, Default)]
pub struct ReadinessState {
    flags: HashMap<ParticipantId, bool>,
    started: bool,
}

impl ReadinessState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new member.
    pub fn track(&mut self, participant: ParticipantId, ready: bool) {
        self.flags.insert(participant, ready);
    }

    /// Stop tracking a departed member, returning its last flag.
    pub fn forget(&mut self, participant: ParticipantId) -> Option<bool> {
        self.flags.remove(&participant)
    }

    pub fn get(&self, participant: ParticipantId) -> Option<bool> {
        self.flags.get(&participant).copied()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Update a member's flag. Returns whether the value changed.
    ///
    /// # Errors
    ///
    /// * `RoomError::NotAMember` if the participant is not tracked
    /// * `RoomError::AlreadyStarted` once the room has started
    pub fn set(&mut self, participant: ParticipantId, ready: bool) -> Result<bool, RoomError> {
        let Some(flag) = self.flags.get_mut(&participant) else {
            return Err(RoomError::NotAMember(participant));
        };
        if self.started {
            return Err(RoomError::AlreadyStarted);
        }
        let changed = *flag != ready;
        *flag = ready;
        Ok(changed)
    }

    /// Compute the aggregate phase for a room of the given capacity.
    ///
    /// `FullReady` requires the member count to equal capacity, so a room
    /// below capacity never reaches it however many members are ready.
    pub fn phase(&self, capacity: usize) -> RoomPhase {
        if self.started {
            RoomPhase::Started
        } else if self.flags.len() < capacity {
            RoomPhase::Forming
        } else if self.flags.values().all(|ready| *ready) {
            RoomPhase::FullReady
        } else {
            RoomPhase::FullNotReady
        }
    }

    /// Promote `FullReady` to `Started`. Returns true at most once.
    pub fn try_start(&mut self, capacity: usize) -> bool {
        if self.phase(capacity) == RoomPhase::FullReady {
            self.started = true;
            true
        } else {
            false
        }
    }
}
