//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 定員を超えて参加できないこと、1 人の参加者が 2 つのルームに同時に所属しないことを保証
//! - 参加によって満員・全員準備完了になった場合に開始が 1 度だけ通知されることを確認
//! - 拒否された参加がルームにも参加者にも痕跡を残さないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加と RoomJoined 通知、作成者の自動準備完了
//! - 異常系：存在しない・期限切れ・閉じた・満員のルーム、二重参加、切断済みの参加者

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{
    CoordinatorEvent, Liveness, Member, ParticipantId, ParticipantRepository, RoomError,
    RoomHandle, RoomName, RoomRepository, RoomSnapshot, Timestamp,
};

use super::{
    error::CoordinatorError,
    notification::{Notification, Outcome},
};

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
    /// 最初のメンバーを準備完了状態で参加させるか
    creator_auto_ready: bool,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
        creator_auto_ready: bool,
    ) -> Self {
        Self {
            rooms,
            participants,
            creator_auto_ready,
        }
    }

    /// ルーム参加を実行
    ///
    /// 参加者のルームを先に確保してから入室させるため、
    /// 同じ参加者が 2 つのルームに同時に入ることはありません。
    ///
    /// # Returns
    ///
    /// * `Ok(Outcome<RoomSnapshot>)` - 参加後のルームのスナップショット
    /// * `Err(CoordinatorError)` - `NotFound` / `Closed` / `Full` / `AlreadyInRoom` など
    pub async fn execute(
        &self,
        participant: ParticipantId,
        name: &RoomName,
        now: Instant,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        // 1. ルームを検索（レジストリのロックはここで解放される）
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;

        // 2. 参加者のルームを確保
        self.participants.claim_room(participant, name).await?;

        // 3. 入室（失敗したら確保を取り消す）
        match self.admit(participant, &handle, now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.participants.release_room(participant, name).await;
                tracing::warn!(%participant, room = %name, error = %e, "join rejected");
                Err(e)
            }
        }
    }

    async fn admit(
        &self,
        participant: ParticipantId,
        handle: &RoomHandle,
        now: Instant,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        let (mut room, ticket) = handle.lock_for_update().await;

        // 期限切れでまだ掃除されていないルームは存在しないものとして扱う
        if room.is_expired(now) {
            return Err(RoomError::NotFound(room.name().clone()).into());
        }

        // 切断処理と競合した場合、ルームのロック内で接続状態を確認する
        let member = match self.participants.get(participant).await {
            Some(p) if p.liveness == Liveness::Connected => {
                Member::new(p.id, p.display_name, Timestamp::now())
            }
            _ => return Err(CoordinatorError::UnknownParticipant(participant)),
        };

        let transition = room.admit(member, self.creator_auto_ready)?;
        let snapshot = room.snapshot();
        let recipients = room.member_ids();
        tracing::info!(
            %participant,
            room = %snapshot.name,
            members = recipients.len(),
            capacity = snapshot.capacity,
            "participant joined room"
        );

        let mut notifications = vec![Notification::new(
            CoordinatorEvent::RoomJoined {
                participant,
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

        Ok(Outcome::new(snapshot, notifications).with_ticket(ticket))
    }
}
