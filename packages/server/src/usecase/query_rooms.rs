//! UseCase: ルーム情報の参照
//!
//! 期限切れでまだ掃除されていないルームは、参加と同じく存在しないものとして扱う。

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{History, RoomError, RoomName, RoomRepository, RoomSnapshot, RoomSummary};

use super::error::CoordinatorError;

/// ルーム参照のユースケース
pub struct QueryRoomsUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl QueryRoomsUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// 全ルームの一覧（名前順）
    pub async fn list(&self, now: Instant) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for handle in self.rooms.all().await {
            let room = handle.lock().await;
            if !room.is_expired(now) {
                summaries.push(room.summary());
            }
        }
        summaries
    }

    pub async fn snapshot(
        &self,
        name: &RoomName,
        now: Instant,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;
        let room = handle.lock().await;
        if room.is_expired(now) {
            return Err(RoomError::NotFound(name.clone()).into());
        }
        Ok(room.snapshot())
    }

    /// チャット履歴（シーケンス番号の昇順）
    pub async fn history(&self, name: &RoomName, now: Instant) -> Result<History, CoordinatorError> {
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;
        let room = handle.lock().await;
        if room.is_expired(now) {
            return Err(RoomError::NotFound(name.clone()).into());
        }
        Ok(room.history())
    }
}
