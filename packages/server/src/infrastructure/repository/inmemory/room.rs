//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## ロック順序
//!
//! レジストリ（HashMap）のロックは検索・追加・削除の間だけ保持します。
//! ルームのロックを取るときは必ず レジストリ → ルーム の順で取得し、
//! ルームのロックを保持したままレジストリをロックすることはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::{sync::RwLock, time::Instant};

use crate::domain::{InsertedRoom, Room, RoomError, RoomHandle, RoomName, RoomRepository};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// ルーム名 → ルームハンドル
    rooms: RwLock<HashMap<RoomName, RoomHandle>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert(&self, room: Room, now: Instant) -> Result<InsertedRoom, RoomError> {
        let mut rooms = self.rooms.write().await;

        // 同名のルームが開いていて期限切れでなければ重複エラー
        if let Some(existing) = rooms.get(room.name()) {
            let guard = existing.lock().await;
            if guard.is_open() && !guard.is_expired(now) {
                return Err(RoomError::DuplicateName(room.name().clone()));
            }
        }

        let handle = RoomHandle::new(room);
        let replaced = rooms.insert(handle.name().clone(), handle.clone());
        Ok(InsertedRoom { handle, replaced })
    }

    async fn get(&self, name: &RoomName) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(name).cloned()
    }

    async fn remove(&self, name: &RoomName) -> Option<RoomHandle> {
        let mut rooms = self.rooms.write().await;
        rooms.remove(name)
    }

    async fn all(&self) -> Vec<RoomHandle> {
        let rooms = self.rooms.read().await;
        let mut handles: Vec<RoomHandle> = rooms.values().cloned().collect();
        handles.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        handles
    }

    async fn remove_expired(&self, now: Instant) -> Vec<RoomName> {
        let mut rooms = self.rooms.write().await;

        let mut expired = Vec::new();
        for (name, handle) in rooms.iter() {
            if handle.lock().await.is_expired(now) {
                expired.push(name.clone());
            }
        }
        for name in &expired {
            rooms.remove(name);
        }
        expired
    }
}
