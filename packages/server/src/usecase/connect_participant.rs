//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - ConnectParticipantUseCase::heartbeat() メソッド
//!
//! ### なぜこのテストが必要か
//! - 同時接続数の上限を超えた接続が ServerFull で拒否されることを保証
//! - 受信のたびに最終応答時刻が更新され、生存判定に使われることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の登録
//! - 異常系：同時接続数の上限超過、未登録の参加者からのハートビート

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{DisplayName, Participant, ParticipantId, ParticipantRepository, Timestamp};

use super::error::CoordinatorError;

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    participants: Arc<dyn ParticipantRepository>,
    /// 同時接続数の上限
    max_participants: Option<usize>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        participants: Arc<dyn ParticipantRepository>,
        max_participants: Option<usize>,
    ) -> Self {
        Self {
            participants,
            max_participants,
        }
    }

    /// 参加者の接続を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Participant)` - 採番された参加者
    /// * `Err(CoordinatorError::ServerFull)` - 同時接続数の上限に達している
    pub async fn execute(
        &self,
        display_name: DisplayName,
        now: Instant,
    ) -> Result<Participant, CoordinatorError> {
        let participant = self
            .participants
            .register(display_name, now, Timestamp::now(), self.max_participants)
            .await?;

        tracing::info!(
            participant = %participant.id,
            display_name = %participant.display_name,
            "participant connected"
        );
        Ok(participant)
    }

    /// 参加者の最終応答時刻を更新
    pub async fn heartbeat(
        &self,
        participant: ParticipantId,
        now: Instant,
    ) -> Result<(), CoordinatorError> {
        self.participants.touch(participant, now).await?;
        Ok(())
    }
}
