//! InMemory Participant Repository 実装
//!
//! 参加者 ID は AtomicU64 で単調に採番し、プロセスの生存期間中は再利用しません。

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};

use crate::domain::{
    DisplayName, Liveness, Participant, ParticipantId, ParticipantRepository, RepositoryError,
    RoomName, Timestamp,
};

/// インメモリ Participant Repository 実装
pub struct InMemoryParticipantRepository {
    next_id: AtomicU64,
    participants: Mutex<HashMap<ParticipantId, Participant>>,
}

impl InMemoryParticipantRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            participants: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryParticipantRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn register(
        &self,
        display_name: DisplayName,
        now: Instant,
        connected_at: Timestamp,
        limit: Option<usize>,
    ) -> Result<Participant, RepositoryError> {
        let mut participants = self.participants.lock().await;
        if let Some(max) = limit
            && participants.len() >= max
        {
            return Err(RepositoryError::ParticipantLimitReached { max });
        }

        let id = ParticipantId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let participant = Participant::new(id, display_name, now, connected_at);
        participants.insert(id, participant.clone());
        Ok(participant)
    }

    async fn get(&self, id: ParticipantId) -> Option<Participant> {
        let participants = self.participants.lock().await;
        participants.get(&id).cloned()
    }

    async fn remove(&self, id: ParticipantId) -> Option<Participant> {
        let mut participants = self.participants.lock().await;
        participants.remove(&id)
    }

    async fn count(&self) -> usize {
        let participants = self.participants.lock().await;
        participants.len()
    }

    async fn touch(&self, id: ParticipantId, now: Instant) -> Result<(), RepositoryError> {
        let mut participants = self.participants.lock().await;
        let participant = participants
            .get_mut(&id)
            .ok_or(RepositoryError::ParticipantNotFound(id))?;
        participant.touch(now);
        Ok(())
    }

    async fn mark_disconnected(&self, id: ParticipantId) -> Result<Participant, RepositoryError> {
        let mut participants = self.participants.lock().await;
        let participant = participants
            .get_mut(&id)
            .ok_or(RepositoryError::ParticipantNotFound(id))?;
        participant.liveness = Liveness::Disconnected;
        Ok(participant.clone())
    }

    async fn claim_room(&self, id: ParticipantId, room: &RoomName) -> Result<(), RepositoryError> {
        let mut participants = self.participants.lock().await;
        let participant = participants
            .get_mut(&id)
            .ok_or(RepositoryError::ParticipantNotFound(id))?;
        if participant.liveness == Liveness::Disconnected {
            return Err(RepositoryError::ParticipantNotFound(id));
        }
        if let Some(current) = &participant.room {
            return Err(RepositoryError::AlreadyInRoom(current.clone()));
        }
        participant.room = Some(room.clone());
        Ok(())
    }

    async fn release_room(&self, id: ParticipantId, room: &RoomName) {
        let mut participants = self.participants.lock().await;
        if let Some(participant) = participants.get_mut(&id)
            && participant.room.as_ref() == Some(room)
        {
            participant.room = None;
        }
    }

    async fn stale(&self, now: Instant, timeout: Duration) -> Vec<ParticipantId> {
        let participants = self.participants.lock().await;
        let mut ids: Vec<ParticipantId> = participants
            .values()
            .filter(|p| p.is_stale(now, timeout))
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }
}
