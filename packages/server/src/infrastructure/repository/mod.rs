//! Repository パターンの実装
//!
//! ドメイン層が定義するルーム・参加者 Repository trait のインメモリ実装を提供します。
//! UseCase 層と Coordinator は trait に依存し、この実装には依存しません。

pub mod inmemory;

pub use inmemory::{InMemoryParticipantRepository, InMemoryRoomRepository};
