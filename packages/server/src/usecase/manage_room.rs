//! UseCase: ルームの開閉と削除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ManageRoomUseCase::set_open() / close() メソッド
//!
//! ### なぜこのテストが必要か
//! - 閉じたルームに新規参加できないことを確認
//! - 開始済みのルームを再び開けないことを保証
//! - 明示的な削除でメンバーが切り離されることを確認

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{
    ParticipantRepository, RemovalReason, RoomError, RoomName, RoomPhase, RoomRepository,
    RoomSnapshot,
};

use super::{
    error::CoordinatorError,
    notification::{Outcome, detach_all},
};

/// ルームの開閉・削除のユースケース
pub struct ManageRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
}

impl ManageRoomUseCase {
    /// 新しい ManageRoomUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
    ) -> Self {
        Self {
            rooms,
            participants,
        }
    }

    /// ルームの参加受付を開閉する
    ///
    /// 開始済みのルームは再び開けない（`AlreadyStarted`）。
    pub async fn set_open(
        &self,
        name: &RoomName,
        open: bool,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;
        let (mut room, ticket) = handle.lock_for_update().await;
        if open && room.phase() == RoomPhase::Started {
            return Err(RoomError::AlreadyStarted.into());
        }
        room.set_open(open);
        tracing::info!(room = %name, open, "room open flag changed");
        Ok(Outcome::silent(room.snapshot()).with_ticket(ticket))
    }

    /// ルームを即座に削除し、メンバーを切り離す
    pub async fn close(
        &self,
        name: &RoomName,
        now: Instant,
    ) -> Result<Outcome<()>, CoordinatorError> {
        let handle = self
            .rooms
            .remove(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;

        let (mut room, ticket) = handle.lock_for_update().await;
        // 古いハンドルを持つ入室処理は Closed で失敗する
        room.set_open(false);
        tracing::info!(room = %name, members = room.members().len(), "room closed");
        let notifications = detach_all(
            &mut room,
            self.participants.as_ref(),
            RemovalReason::Closed,
            now,
        )
        .await;

        Ok(Outcome::new((), notifications).with_ticket(ticket))
    }
}
