//! UseCase: ルーム作成処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CreateRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - ルーム名の一意性（開いていて期限切れでないルームとの重複禁止）を保証
//! - 閉じたルームを同名で作り直したとき、残っていたメンバーが切り離されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ルームの作成、閉じたルーム・期限切れルームの置き換え
//! - 異常系：重複したルーム名、定員 0、上限を超える定員

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{
    ChatPolicy, ParticipantRepository, RemovalReason, Room, RoomError, RoomName, RoomOptions,
    RoomRepository, RoomSnapshot, Timestamp,
};

use super::{
    error::CoordinatorError,
    notification::{Outcome, detach_all},
};

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
    chat: ChatPolicy,
    /// 作成できるルームの最大定員
    max_capacity: usize,
}

impl CreateRoomUseCase {
    /// 新しい CreateRoomUseCase を作成
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
        chat: ChatPolicy,
        max_capacity: usize,
    ) -> Self {
        Self {
            rooms,
            participants,
            chat,
            max_capacity,
        }
    }

    /// ルーム作成を実行
    ///
    /// 定員と空ルームの TTL は `options` でルームごとに指定します。
    /// 同名のルームが閉じているか期限切れであれば置き換え、
    /// 残っていたメンバーを切り離します。
    ///
    /// # Returns
    ///
    /// * `Ok(Outcome<RoomSnapshot>)` - 作成したルームのスナップショット
    /// * `Err(CoordinatorError)` - `DuplicateName` または `InvalidCapacity`
    pub async fn execute(
        &self,
        name: RoomName,
        options: RoomOptions,
        now: Instant,
    ) -> Result<Outcome<RoomSnapshot>, CoordinatorError> {
        if options.capacity > self.max_capacity {
            return Err(RoomError::InvalidCapacity(options.capacity).into());
        }
        let capacity = options.capacity;
        let empty_ttl_ms = options.empty_ttl.as_millis() as u64;
        let room = Room::new(name, options, self.chat, now, Timestamp::now())?;

        // 1. レジストリに登録（開いている同名ルームがあれば重複エラー）
        let inserted = self.rooms.insert(room, now).await?;
        let snapshot = inserted.handle.snapshot().await;
        tracing::info!(room = %snapshot.name, capacity, empty_ttl_ms, "room created");

        // 2. 置き換えたルームのメンバーを切り離す
        let outcome = match inserted.replaced {
            Some(replaced) => {
                let (mut old, ticket) = replaced.lock_for_update().await;
                tracing::info!(
                    room = %snapshot.name,
                    members = old.members().len(),
                    "replacing closed or expired room"
                );
                let notifications = detach_all(
                    &mut old,
                    self.participants.as_ref(),
                    RemovalReason::Replaced,
                    now,
                )
                .await;
                Outcome::new(snapshot, notifications).with_ticket(ticket)
            }
            None => Outcome::silent(snapshot),
        };

        Ok(outcome)
    }
}
