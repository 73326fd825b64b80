//! Repository traits.
//!
//! The usecase layer depends on these traits; `infrastructure::repository`
//! provides the in-memory implementations (dependency inversion).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, MutexGuard, OwnedMutexGuard},
    time::Instant,
};

use super::{
    entity::{Participant, Room, RoomSnapshot},
    error::{RepositoryError, RoomError},
    value_object::{DisplayName, ParticipantId, RoomName, Timestamp},
};

/// Shared handle to one room.
///
/// The mutex is the room's serialization point: membership, readiness and
/// chat of a room only change while it is held.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: RoomName,
    room: Arc<Mutex<Room>>,
    /// Taken after `room`; held until a mutation's notifications are delivered
    outbox: Arc<Mutex<()>>,
}

/// Exclusive right to publish a room's notifications.
///
/// Tickets are handed out in the order the room lock was taken, so holding
/// one while delivering keeps a room's messages in mutation order.
#[derive(Debug)]
pub struct PublishTicket {
    _slot: OwnedMutexGuard<()>,
}

impl RoomHandle {
    pub fn new(room: Room) -> Self {
        Self {
            name: room.name().clone(),
            room: Arc::new(Mutex::new(room)),
            outbox: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub async fn lock(&self) -> MutexGuard<'_, Room> {
        self.room.lock().await
    }

    /// Lock the room for a mutation whose notifications will be published.
    ///
    /// Waits for the previous mutation's delivery to finish while holding the
    /// room lock. The ticket outlives the guard and must be kept until the
    /// notifications are delivered.
    pub async fn lock_for_update(&self) -> (MutexGuard<'_, Room>, PublishTicket) {
        let room = self.room.lock().await;
        let ticket = PublishTicket {
            _slot: self.outbox.clone().lock_owned().await,
        };
        (room, ticket)
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        self.room.lock().await.snapshot()
    }

    /// Whether two handles point at the same room instance.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        Arc::ptr_eq(&self.room, &other.room)
    }
}

/// Result of registering a room
#[derive(Debug)]
pub struct InsertedRoom {
    pub handle: RoomHandle,
    /// A closed or expired room that previously held the name
    pub replaced: Option<RoomHandle>,
}

/// Room registry.
///
/// Implementations lock the registry before any room, never the other way round.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Register a new room.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::DuplicateName` if a room with the same name exists,
    /// is open and has not expired. A closed or expired room is replaced.
    async fn insert(&self, room: Room, now: Instant) -> Result<InsertedRoom, RoomError>;

    async fn get(&self, name: &RoomName) -> Option<RoomHandle>;

    async fn remove(&self, name: &RoomName) -> Option<RoomHandle>;

    /// All registered rooms, sorted by name.
    async fn all(&self) -> Vec<RoomHandle>;

    /// Remove every room that is expired at `now`, returning their names.
    async fn remove_expired(&self, now: Instant) -> Vec<RoomName>;
}

/// Participant directory.
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Allocate an id and register a connected participant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ParticipantLimitReached` if `limit` participants
    /// are already registered.
    async fn register(
        &self,
        display_name: DisplayName,
        now: Instant,
        connected_at: Timestamp,
        limit: Option<usize>,
    ) -> Result<Participant, RepositoryError>;

    async fn get(&self, id: ParticipantId) -> Option<Participant>;

    async fn remove(&self, id: ParticipantId) -> Option<Participant>;

    async fn count(&self) -> usize;

    /// Refresh the participant's last-seen instant.
    async fn touch(&self, id: ParticipantId, now: Instant) -> Result<(), RepositoryError>;

    /// Mark the participant disconnected, returning its state at that moment.
    async fn mark_disconnected(&self, id: ParticipantId) -> Result<Participant, RepositoryError>;

    /// Reserve `room` as the participant's room. Fails if it already has one.
    async fn claim_room(&self, id: ParticipantId, room: &RoomName) -> Result<(), RepositoryError>;

    /// Clear the participant's room if it is still `room`.
    async fn release_room(&self, id: ParticipantId, room: &RoomName);

    /// Participants silent for at least `timeout` at `now`.
    async fn stale(&self, now: Instant, timeout: Duration) -> Vec<ParticipantId>;
}
