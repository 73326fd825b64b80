//! HashMap ベースのインメモリ Repository

pub mod participant;
pub mod room;

pub use participant::InMemoryParticipantRepository;
pub use room::InMemoryRoomRepository;
