//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{ParticipantId, RepositoryError, RoomError, ValueObjectError};

/// Coordinator 操作のエラー
///
/// いずれも回復可能で、拒否された操作はエンティティを一切変更しません。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Invalid(#[from] ValueObjectError),

    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("server is full ({max} participants)")]
    ServerFull { max: usize },

    #[error("malformed message: {0}")]
    Malformed(String),
}

impl From<RepositoryError> for CoordinatorError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ParticipantNotFound(id) => Self::UnknownParticipant(id),
            RepositoryError::AlreadyInRoom(room) => Self::Room(RoomError::AlreadyInRoom(room)),
            RepositoryError::ParticipantLimitReached { max } => Self::ServerFull { max },
        }
    }
}
