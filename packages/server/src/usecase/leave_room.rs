//! UseCase: ルーム退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 退出が冪等であること（未参加・ルーム消滅後でもエラーにならない）を保証
//! - 退出したメンバーの準備状態とチャットのクールダウンが同時に消えることを確認
//! - 開始前のルームから抜けると Forming に戻ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：退出と RoomLeft 通知、最後のメンバーの退出による TTL の開始
//! - エッジケース：未参加の参加者、存在しないルーム

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{
    CoordinatorEvent, ParticipantId, ParticipantRepository, RoomName, RoomRepository,
};

use super::notification::{Notification, Outcome};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
    ) -> Self {
        Self {
            rooms,
            participants,
        }
    }

    /// ルーム退出を実行
    ///
    /// # Returns
    ///
    /// 実際にメンバーから外れた場合は `true`。エラーは返さない。
    pub async fn execute(
        &self,
        participant: ParticipantId,
        name: &RoomName,
        now: Instant,
    ) -> Outcome<bool> {
        let Some(handle) = self.rooms.get(name).await else {
            self.participants.release_room(participant, name).await;
            return Outcome::silent(false);
        };

        let (mut room, ticket) = handle.lock_for_update().await;
        if room.remove(participant, now).is_none() {
            // 入室処理中の確保を取り消さないよう、メンバーでなければ何もしない
            return Outcome::silent(false);
        }
        self.participants.release_room(participant, name).await;

        let snapshot = room.snapshot();
        let mut recipients = room.member_ids();
        recipients.push(participant);
        tracing::info!(
            %participant,
            room = %name,
            remaining = snapshot.members.len(),
            "participant left room"
        );

        Outcome::new(
            true,
            vec![Notification::new(
                CoordinatorEvent::RoomLeft {
                    participant,
                    room: snapshot,
                },
                recipients,
            )],
        )
        .with_ticket(ticket)
    }
}
