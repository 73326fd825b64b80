//! Domain layer error definitions.

use std::time::Duration;

use thiserror::Error;

use super::value_object::{ParticipantId, RoomName};

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("DisplayName cannot be empty")]
    DisplayNameEmpty,

    #[error("DisplayName cannot exceed {max} characters (got {actual})")]
    DisplayNameTooLong { max: usize, actual: usize },

    #[error("RoomName cannot be empty")]
    RoomNameEmpty,

    #[error("RoomName cannot exceed {max} bytes (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    #[error("MessageText cannot be empty")]
    MessageTextEmpty,

    #[error("MessageText cannot exceed {max} characters (got {actual})")]
    MessageTextTooLong { max: usize, actual: usize },
}

/// Errors related to Room domain logic.
///
/// Every variant is a local, recoverable rejection; the room is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("a room named '{0}' already exists")]
    DuplicateName(RoomName),

    #[error("room capacity {0} is out of range")]
    InvalidCapacity(usize),

    #[error("room '{0}' not found")]
    NotFound(RoomName),

    #[error("room '{name}' is full ({capacity} participants)")]
    Full { name: RoomName, capacity: usize },

    #[error("room '{0}' is closed")]
    Closed(RoomName),

    #[error("participant {0} is not a member of the room")]
    NotAMember(ParticipantId),

    #[error("participant is already in room '{0}'")]
    AlreadyInRoom(RoomName),

    #[error("the room has already started")]
    AlreadyStarted,

    #[error("message is empty")]
    EmptyMessage,

    #[error("message cannot exceed {max} characters (got {actual})")]
    MessageTooLong { max: usize, actual: usize },

    #[error("sending too fast; retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

/// Errors related to Repository operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),

    #[error("participant is already in room '{0}'")]
    AlreadyInRoom(RoomName),

    #[error("participant limit reached: maximum {max} connected participants")]
    ParticipantLimitReached { max: usize },
}
