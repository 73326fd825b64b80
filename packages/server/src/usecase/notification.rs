//! UseCase の実行結果として返される通知
//!
//! UseCase はルームのロック内で状態を変更し、通知を組み立てて返すだけです。
//! イベントの発行とトランスポートへの配送はロック解放後に Coordinator が行います。
//! 同じルームの通知が変更順に配送されるよう、Outcome はルームの配送チケットを持ち回ります。

use tokio::time::Instant;

use crate::domain::{
    CoordinatorEvent, ParticipantId, ParticipantRepository, PublishTicket, RemovalReason, Room,
};

/// 発行するイベントと、その内容を配送する参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: CoordinatorEvent,
    /// 配送先（空ならイベント購読者にのみ通知）
    pub recipients: Vec<ParticipantId>,
}

impl Notification {
    pub fn new(event: CoordinatorEvent, recipients: Vec<ParticipantId>) -> Self {
        Self { event, recipients }
    }

    /// 配送先のないイベント
    pub fn event_only(event: CoordinatorEvent) -> Self {
        Self::new(event, Vec::new())
    }
}

/// UseCase の戻り値と通知のペア
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub notifications: Vec<Notification>,
    /// 通知の配送が終わるまで保持する、変更したルームの配送チケット
    pub ticket: Option<PublishTicket>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, notifications: Vec<Notification>) -> Self {
        Self {
            value,
            notifications,
            ticket: None,
        }
    }

    pub fn silent(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    pub fn with_ticket(mut self, ticket: PublishTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// 配送せずにチケットを手放す（同じルームを続けて操作するテスト用）
    #[cfg(test)]
    pub fn released(mut self) -> Self {
        self.ticket = None;
        self
    }
}

/// ルームの全メンバーを退出させ、RoomLeft と RoomRemoved の通知を返す
///
/// 呼び出し側はルームのロックを保持していること。
/// 参加者リポジトリのロックはルームのロックの内側でのみ短時間取得する。
pub(crate) async fn detach_all(
    room: &mut Room,
    participants: &dyn ParticipantRepository,
    reason: RemovalReason,
    now: Instant,
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    for id in room.member_ids() {
        if room.remove(id, now).is_none() {
            continue;
        }
        participants.release_room(id, room.name()).await;

        let mut recipients = room.member_ids();
        recipients.push(id);
        notifications.push(Notification::new(
            CoordinatorEvent::RoomLeft {
                participant: id,
                room: room.snapshot(),
            },
            recipients,
        ));
    }

    notifications.push(Notification::event_only(CoordinatorEvent::RoomRemoved {
        room: room.name().clone(),
        reason,
    }));
    notifications
}
