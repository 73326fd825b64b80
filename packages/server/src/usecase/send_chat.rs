//! UseCase: チャット投稿処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendChatUseCase::execute() メソッド
//! - チャット投稿処理（配送対象の選定、メッセージ履歴への追加）
//!
//! ### なぜこのテストが必要か
//! - 投稿者を含む全メンバーに配送されることを確認
//! - 空メッセージと連投が拒否され、履歴にもクールダウンにも影響しないことを保証
//! - 履歴の上限を超えると古いメッセージから捨てられ、シーケンス番号は再利用されないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：投稿とブロードキャスト
//! - 異常系：メンバーでない参加者、空メッセージ、クールダウン中の投稿

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{
    ChatMessage, CoordinatorEvent, ParticipantId, RoomError, RoomName, RoomRepository, Timestamp,
};

use super::{
    error::CoordinatorError,
    notification::{Notification, Outcome},
};

/// チャット投稿のユースケース
pub struct SendChatUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl SendChatUseCase {
    /// 新しい SendChatUseCase を作成
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    /// チャット投稿を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Outcome<ChatMessage>)` - 採番されたメッセージ（配送対象は投稿者を含む全メンバー）
    /// * `Err(CoordinatorError)` - `NotFound` / `NotAMember` / `EmptyMessage` / `MessageTooLong` / `RateLimited`
    pub async fn execute(
        &self,
        sender: ParticipantId,
        name: &RoomName,
        text: &str,
        now: Instant,
    ) -> Result<Outcome<ChatMessage>, CoordinatorError> {
        let handle = self
            .rooms
            .get(name)
            .await
            .ok_or_else(|| RoomError::NotFound(name.clone()))?;

        let (mut room, ticket) = handle.lock_for_update().await;
        let message = room.post(sender, text, now, Timestamp::now())?;
        let recipients = room.member_ids();
        tracing::debug!(
            %sender,
            room = %name,
            sequence = %message.sequence,
            recipients = recipients.len(),
            "chat message posted"
        );

        Ok(Outcome::new(
            message.clone(),
            vec![Notification::new(
                CoordinatorEvent::ChatPosted {
                    room: name.clone(),
                    message,
                },
                recipients,
            )],
        )
        .with_ticket(ticket))
    }
}
