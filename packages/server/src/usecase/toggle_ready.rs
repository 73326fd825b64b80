//! UseCase: 準備完了の切り替え処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ToggleReadyUseCase::execute() / toggle() メソッド
//!
//! ### なぜこのテストが必要か
//! - 満員かつ全員準備完了になった瞬間に開始が 1 度だけ通知されることを保証
//! - 同じ値の再設定が何も通知しないことを確認
//! - 開始後の切り替えが AlreadyStarted で拒否されることを確認
//! - 並行して準備完了を送っても開始が重複しないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：準備完了の変更と ReadyChanged 通知、開始
//! - 異常系：メンバーでない参加者、開始後の変更、存在しないルーム

use std::sync::Arc;

use crate::domain::{
    CoordinatorEvent, ParticipantId, Room, RoomError, RoomName, RoomRepository, RoomSnapshot,
};

use super::{
    error::CoordinatorError,
    notification::{Notification, Outcome},
};

/// 準備完了切り替えのユースケース
pub struct ToggleReadyUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl ToggleReadyUseCase {
    /// 新しい ToggleReadyUseCase を作成
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// 準備完了フラグを `ready` に設定
    ///
    /// # Returns
    ///
    /// * `Ok(Outcome<RoomSnapshot>)` - 変更後のルームのスナップショット
    /// * `Err(CoordinatorError)` - `NotFound` / `NotAMember` / `AlreadyStarted`
    pub async fn execute(
        &self,
        participant: ParticipantId,
        name: &RoomName,
        ready: bool,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;
        let (mut room, ticket) = handle.lock_for_update().await;
        Ok(Self::apply(&mut room, participant, ready)?.with_ticket(ticket))
    }

    /// 準備完了フラグを反転
    pub async fn toggle(
        &self,
        participant: ParticipantId,
        name: &RoomName,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;
        let (mut room, ticket) = handle.lock_for_update().await;
        let current = room
            .is_ready(participant)
            .ok_or(RoomError::NotAMember(participant))?;
        Ok(Self::apply(&mut room, participant, !current)?.with_ticket(ticket))
    }

    fn apply(
        room: &mut Room,
        participant: ParticipantId,
        ready: bool,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        let transition = room.set_ready(participant, ready)?;
        let snapshot = room.snapshot();
        if !transition.changed {
            return Ok(Outcome::silent(snapshot));
        }

        let recipients = room.member_ids();
        tracing::info!(
            %participant,
            room = %snapshot.name,
            ready,
            phase = ?transition.phase,
            "readiness changed"
        );

        let mut notifications = vec![Notification::new(
            CoordinatorEvent::ReadyChanged {
                participant,
                ready,
                room: snapshot.clone(),
            },
            recipients.clone(),
        )];
        if transition.start {
            tracing::info!(room = %snapshot.name, "all members ready, game starting");
            notifications.push(Notification::new(
                CoordinatorEvent::GameStart {
                    room: snapshot.clone(),
                },
                recipients,
            ));
        }

        Ok(Outcome::new(snapshot, notifications))
    }
}
