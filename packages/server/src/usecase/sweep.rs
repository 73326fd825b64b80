//! UseCase: 定期掃除
//!
//! TTL を過ぎた空ルームの削除と、応答のない参加者の洗い出しを行う。
//! 応答のない参加者は Coordinator が明示的な切断と同じ手順で 1 人ずつ切断する。

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::domain::{
    CoordinatorEvent, ParticipantId, ParticipantRepository, RemovalReason, RoomName,
    RoomRepository,
};

use super::notification::{Notification, Outcome};

/// 掃除の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 削除した期限切れのルーム
    pub expired_rooms: Vec<RoomName>,
    /// 応答がなく切断した参加者
    pub disconnected: Vec<ParticipantId>,
}

/// 定期掃除のユースケース
pub struct SweepUseCase {
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
    liveness_timeout: Duration,
}

impl SweepUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
        liveness_timeout: Duration,
    ) -> Self {
        Self {
            rooms,
            participants,
            liveness_timeout,
        }
    }

    /// TTL を過ぎた空ルームを削除する
    pub async fn expire_rooms(&self, now: Instant) -> Outcome<Vec<RoomName>> {
        let expired_rooms = self.rooms.remove_expired(now).await;
        let notifications = expired_rooms
            .iter()
            .map(|room| {
                tracing::info!(%room, "empty room expired and removed");
                Notification::event_only(CoordinatorEvent::RoomRemoved {
                    room: room.clone(),
                    reason: RemovalReason::Expired,
                })
            })
            .collect();
        Outcome::new(expired_rooms, notifications)
    }

    /// `liveness_timeout` 以上応答のない参加者
    pub async fn stale_participants(&self, now: Instant) -> Vec<ParticipantId> {
        self.participants.stale(now, self.liveness_timeout).await
    }
}
