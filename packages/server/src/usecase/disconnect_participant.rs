//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 参加者の切断処理（ルームからの退出、通知対象選定、参加者削除）
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：切断時に同じルームの他のメンバーに通知される
//! - 開始前のルームから切断されると Forming に戻り、残ったメンバーの準備状態が保たれることを確認
//! - 二重の切断通知がエラーにならないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム参加中の参加者の切断と通知
//! - エッジケース：ルームに参加していない参加者の切断、存在しない参加者の切断

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{
    CoordinatorEvent, Participant, ParticipantId, ParticipantRepository, RoomRepository,
};

use super::notification::{Notification, Outcome};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
    ) -> Self {
        Self {
            rooms,
            participants,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// 切断した参加者。既に切断済み・未登録なら `None`（通知なし）。
    pub async fn execute(
        &self,
        participant: ParticipantId,
        now: Instant,
    ) -> Outcome<Option<Participant>> {
        // 1. 先に切断状態にして、以降の入室を止める
        let Ok(disconnected) = self.participants.mark_disconnected(participant).await else {
            return Outcome::silent(None);
        };

        let mut notifications = Vec::new();
        let mut ticket = None;

        // 2. 参加中のルームから退出
        if let Some(name) = &disconnected.room
            && let Some(handle) = self.rooms.get(name).await
        {
            let (mut room, room_ticket) = handle.lock_for_update().await;
            ticket = Some(room_ticket);
            if room.remove(participant, now).is_some() {
                tracing::info!(%participant, room = %name, "disconnected participant removed from room");
                notifications.push(Notification::new(
                    CoordinatorEvent::RoomLeft {
                        participant,
                        room: room.snapshot(),
                    },
                    room.member_ids(),
                ));
            }
        }

        // 3. Repository から削除
        self.participants.remove(participant).await;
        tracing::info!(
            %participant,
            display_name = %disconnected.display_name,
            "participant disconnected"
        );

        notifications.push(Notification::event_only(
            CoordinatorEvent::ParticipantDisconnected {
                participant,
                display_name: disconnected.display_name.clone(),
            },
        ));

        Outcome {
            ticket,
            ..Outcome::new(Some(disconnected), notifications)
        }
    }
}
