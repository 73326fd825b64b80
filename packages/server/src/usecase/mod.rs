//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! Coordinator から呼び出され、Domain 層を操作します。
//! 各 UseCase は状態変更の結果として通知（Notification）を返し、
//! 配送は呼び出し側がロック解放後に行います。

pub mod connect_participant;
pub mod create_room;
pub mod disconnect_participant;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod manage_room;
pub mod notification;
pub mod query_rooms;
pub mod send_chat;
pub mod sweep;
pub mod toggle_ready;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect_participant::ConnectParticipantUseCase;
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::CoordinatorError;
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use manage_room::ManageRoomUseCase;
pub use notification::{Notification, Outcome};
pub use query_rooms::QueryRoomsUseCase;
pub use send_chat::SendChatUseCase;
pub use sweep::{SweepReport, SweepUseCase};
pub use toggle_ready::ToggleReadyUseCase;
