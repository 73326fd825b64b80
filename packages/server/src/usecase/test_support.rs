//! UseCase テスト用のヘルパー

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::{
    domain::{
        ChatPolicy, DisplayName, ParticipantId, ParticipantRepository, Room, RoomHandle,
        RoomName, RoomOptions, RoomRepository, Timestamp,
    },
    infrastructure::repository::{InMemoryParticipantRepository, InMemoryRoomRepository},
};

pub(crate) struct Fixture {
    pub rooms: Arc<InMemoryRoomRepository>,
    pub participants: Arc<InMemoryParticipantRepository>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(InMemoryRoomRepository::new()),
            participants: Arc::new(InMemoryParticipantRepository::new()),
        }
    }

    pub fn rooms(&self) -> Arc<dyn RoomRepository> {
        self.rooms.clone()
    }

    pub fn participants(&self) -> Arc<dyn ParticipantRepository> {
        self.participants.clone()
    }

    /// 接続済みの参加者を登録
    pub async fn participant(&self, name: &str) -> ParticipantId {
        self.participants
            .register(
                DisplayName::new(name).unwrap(),
                Instant::now(),
                Timestamp::new(0),
                None,
            )
            .await
            .unwrap()
            .id
    }

    /// 定員 `capacity` の空ルームを登録
    pub async fn room(&self, name: &str, capacity: usize) -> RoomHandle {
        self.room_with_policy(name, capacity, ChatPolicy::default())
            .await
    }

    pub async fn room_with_policy(
        &self,
        name: &str,
        capacity: usize,
        policy: ChatPolicy,
    ) -> RoomHandle {
        let now = Instant::now();
        let room = Room::new(
            room_name(name),
            RoomOptions::new(capacity).with_empty_ttl(Duration::from_millis(1000)),
            policy,
            now,
            Timestamp::new(0),
        )
        .unwrap();
        self.rooms.insert(room, now).await.unwrap().handle
    }

    /// 参加者の現在のルーム
    pub async fn room_of(&self, id: ParticipantId) -> Option<RoomName> {
        self.participants.get(id).await.and_then(|p| p.room)
    }
}

pub(crate) fn room_name(name: &str) -> RoomName {
    RoomName::new(name).unwrap()
}
