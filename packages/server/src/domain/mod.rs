//! Domain layer for the readiness coordinator.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod chat;
pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod message;
pub mod readiness;
pub mod repository;
pub mod transport;
pub mod value_object;

pub use chat::{ChatLog, ChatMessage, ChatPolicy, History};
pub use entity::{
    Liveness, Member, MemberState, Participant, Room, RoomOptions, RoomSnapshot, RoomSummary,
};
pub use error::{RepositoryError, RoomError, ValueObjectError};
pub use event::{CoordinatorEvent, RemovalReason};
pub use factory::RoomNameFactory;
pub use message::{ClientMessage, ServerMessage};
pub use readiness::{ReadinessState, ReadyTransition, RoomPhase};
pub use repository::{
    InsertedRoom, ParticipantRepository, PublishTicket, RoomHandle, RoomRepository,
};
pub use transport::{MessagingTransport, TransportError};
pub use value_object::{DisplayName, MessageText, ParticipantId, RoomName, SequenceNumber, Timestamp};
