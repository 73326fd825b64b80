//! Coordinator facade.
//!
//! Ties the use cases together, publishes their notifications on the event
//! channel and delivers the matching server messages through the transport.
//! Notifications are only delivered after the room lock has been released,
//! but a room's next update waits until the previous one has been delivered,
//! so members see a room's changes in the order they were made.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    config::CoordinatorConfig,
    domain::{
        ChatMessage, ClientMessage, CoordinatorEvent, DisplayName, History, MessagingTransport,
        Participant, ParticipantId, ParticipantRepository, RoomError, RoomName, RoomNameFactory,
        RoomOptions, RoomRepository, RoomSnapshot, RoomSummary, SequenceNumber, ServerMessage,
    },
    infrastructure::{
        codec,
        repository::{InMemoryParticipantRepository, InMemoryRoomRepository},
    },
    usecase::{
        ConnectParticipantUseCase, CoordinatorError, CreateRoomUseCase,
        DisconnectParticipantUseCase, JoinRoomUseCase, LeaveRoomUseCase, ManageRoomUseCase,
        Notification, Outcome, QueryRoomsUseCase, SendChatUseCase, SweepReport, SweepUseCase,
        ToggleReadyUseCase,
    },
};

/// Top-level API of the room membership and readiness coordinator
pub struct Coordinator {
    config: CoordinatorConfig,
    rooms: Arc<dyn RoomRepository>,
    participants: Arc<dyn ParticipantRepository>,
    transport: Arc<dyn MessagingTransport>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl Coordinator {
    /// Create a coordinator backed by the in-memory repositories.
    pub fn new(config: CoordinatorConfig, transport: Arc<dyn MessagingTransport>) -> Self {
        Self::with_repositories(
            config,
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(InMemoryParticipantRepository::new()),
            transport,
        )
    }

    pub fn with_repositories(
        config: CoordinatorConfig,
        rooms: Arc<dyn RoomRepository>,
        participants: Arc<dyn ParticipantRepository>,
        transport: Arc<dyn MessagingTransport>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            config,
            rooms,
            participants,
            transport,
            events,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Subscribe to coordinator events.
    ///
    /// Slow subscribers lag and miss events rather than blocking the coordinator.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    // ========================================
    // Participants
    // ========================================

    /// Register a connected participant.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::ServerFull` when the participant cap is reached.
    pub async fn register_participant(
        &self,
        display_name: DisplayName,
    ) -> Result<Participant, CoordinatorError> {
        ConnectParticipantUseCase::new(self.participants.clone(), self.config.max_participants)
            .execute(display_name, Instant::now())
            .await
    }

    /// Greet a freshly registered participant with its id.
    pub async fn welcome(&self, participant: &Participant) {
        self.notify(
            participant.id,
            &ServerMessage::Welcome {
                participant: participant.id,
                display_name: participant.display_name.clone(),
            },
        )
        .await;
    }

    /// Refresh the participant's liveness.
    pub async fn heartbeat(&self, participant: ParticipantId) -> Result<(), CoordinatorError> {
        ConnectParticipantUseCase::new(self.participants.clone(), self.config.max_participants)
            .heartbeat(participant, Instant::now())
            .await
    }

    /// Disconnect a participant, leaving its room and closing its connection.
    /// Returns false if it was unknown.
    pub async fn disconnect(&self, participant: ParticipantId) -> bool {
        let disconnected = self.detach(participant).await;
        self.transport.close(participant).await;
        disconnected
    }

    /// Transport callback for a lost connection.
    pub async fn on_disconnect(&self, participant: ParticipantId) {
        self.detach(participant).await;
    }

    async fn detach(&self, participant: ParticipantId) -> bool {
        let outcome = DisconnectParticipantUseCase::new(self.rooms.clone(), self.participants.clone())
            .execute(participant, Instant::now())
            .await;
        self.publish(outcome).await.is_some()
    }

    // ========================================
    // Room registry
    // ========================================

    /// Create a room with the configured empty-room TTL.
    pub async fn create_room(
        &self,
        name: RoomName,
        capacity: usize,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        self.create_room_with_options(
            name,
            RoomOptions::new(capacity).with_empty_ttl(self.config.empty_room_ttl),
        )
        .await
    }

    /// Create a room with its own capacity and empty-room TTL.
    ///
    /// # Errors
    ///
    /// `InvalidCapacity` when the capacity is zero or above `max_capacity`,
    /// `DuplicateName` when a live room already has the name.
    pub async fn create_room_with_options(
        &self,
        name: RoomName,
        options: RoomOptions,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        let outcome = CreateRoomUseCase::new(
            self.rooms.clone(),
            self.participants.clone(),
            self.config.chat,
            self.config.max_capacity,
        )
        .execute(name, options, Instant::now())
        .await?;
        Ok(self.publish(outcome).await)
    }

    pub async fn join_room(
        &self,
        participant: ParticipantId,
        name: &RoomName,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        let outcome = JoinRoomUseCase::new(
            self.rooms.clone(),
            self.participants.clone(),
            self.config.creator_auto_ready,
        )
        .execute(participant, name, Instant::now())
        .await?;
        Ok(self.publish(outcome).await)
    }

    /// Leave a room. Idempotent: returns false if the participant was not a member.
    pub async fn leave_room(&self, participant: ParticipantId, name: &RoomName) -> bool {
        let outcome = LeaveRoomUseCase::new(self.rooms.clone(), self.participants.clone())
            .execute(participant, name, Instant::now())
            .await;
        self.publish(outcome).await
    }

    /// Leave whatever room the participant is in.
    pub async fn leave_current(&self, participant: ParticipantId) -> bool {
        match self.current_room(participant).await {
            Ok(name) => self.leave_room(participant, &name).await,
            Err(_) => false,
        }
    }

    /// Join the named room, creating it first if it does not exist.
    ///
    /// Without a name a room with a generated code is created. `capacity`
    /// and `empty_ttl` only apply to a room created here.
    pub async fn request_join_or_create(
        &self,
        participant: ParticipantId,
        name: Option<RoomName>,
        capacity: Option<usize>,
        empty_ttl: Option<Duration>,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        // 部屋を作る前に参加できる状態か確認する
        match self.participants.get(participant).await {
            None => return Err(CoordinatorError::UnknownParticipant(participant)),
            Some(p) => {
                if let Some(current) = p.room {
                    return Err(RoomError::AlreadyInRoom(current).into());
                }
            }
        }

        let options = RoomOptions::new(capacity.unwrap_or(self.config.default_capacity))
            .with_empty_ttl(empty_ttl.unwrap_or(self.config.empty_room_ttl));
        let name = match name {
            Some(name) => name,
            None => {
                let name = RoomNameFactory::generate()?;
                self.create_room_with_options(name.clone(), options).await?;
                return self.join_room(participant, &name).await;
            }
        };

        match self.join_room(participant, &name).await {
            Err(CoordinatorError::Room(RoomError::NotFound(_))) => {}
            other => return other,
        }
        match self.create_room_with_options(name.clone(), options).await {
            // 他の参加者が先に作成した場合はそのまま参加する
            Ok(_) | Err(CoordinatorError::Room(RoomError::DuplicateName(_))) => {}
            Err(e) => return Err(e),
        }
        self.join_room(participant, &name).await
    }

    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        QueryRoomsUseCase::new(self.rooms.clone())
            .list(Instant::now())
            .await
    }

    pub async fn room_snapshot(&self, name: &RoomName) -> Result<RoomSnapshot, CoordinatorError> {
        QueryRoomsUseCase::new(self.rooms.clone())
            .snapshot(name, Instant::now())
            .await
    }

    /// Open or close a room to new joiners, telling its members.
    pub async fn set_room_open(
        &self,
        name: &RoomName,
        open: bool,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        let outcome = ManageRoomUseCase::new(self.rooms.clone(), self.participants.clone())
            .set_open(name, open)
            .await?;
        let snapshot = outcome.value.clone();
        self.deliver(
            name,
            &snapshot.member_ids(),
            &ServerMessage::RoomState {
                room: snapshot.clone(),
            },
        )
        .await;
        Ok(self.publish(outcome).await)
    }

    /// Destroy a room immediately, detaching its members.
    pub async fn close_room(&self, name: &RoomName) -> Result<(), CoordinatorError> {
        let outcome = ManageRoomUseCase::new(self.rooms.clone(), self.participants.clone())
            .close(name, Instant::now())
            .await?;
        self.publish(outcome).await;
        Ok(())
    }

    // ========================================
    // Readiness
    // ========================================

    pub async fn set_ready(
        &self,
        participant: ParticipantId,
        name: &RoomName,
        ready: bool,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        let outcome = ToggleReadyUseCase::new(self.rooms.clone())
            .execute(participant, name, ready)
            .await?;
        Ok(self.publish(outcome).await)
    }

    pub async fn toggle_ready(
        &self,
        participant: ParticipantId,
        name: &RoomName,
    ) -> Result<RoomSnapshot, CoordinatorError> {
        let outcome = ToggleReadyUseCase::new(self.rooms.clone())
            .toggle(participant, name)
            .await?;
        Ok(self.publish(outcome).await)
    }

    // ========================================
    // Chat
    // ========================================

    /// Post to a room's chat, returning the assigned sequence number.
    pub async fn post(
        &self,
        name: &RoomName,
        sender: ParticipantId,
        text: &str,
    ) -> Result<SequenceNumber, CoordinatorError> {
        let outcome = SendChatUseCase::new(self.rooms.clone())
            .execute(sender, name, text, Instant::now())
            .await?;
        Ok(self.publish(outcome).await.sequence)
    }

    /// Post to the sender's current room.
    pub async fn send_chat(
        &self,
        sender: ParticipantId,
        text: &str,
    ) -> Result<ChatMessage, CoordinatorError> {
        let name = self.current_room(sender).await?;
        let outcome = SendChatUseCase::new(self.rooms.clone())
            .execute(sender, &name, text, Instant::now())
            .await?;
        Ok(self.publish(outcome).await)
    }

    pub async fn history(&self, name: &RoomName) -> Result<History, CoordinatorError> {
        QueryRoomsUseCase::new(self.rooms.clone())
            .history(name, Instant::now())
            .await
    }

    // ========================================
    // Transport callbacks and housekeeping
    // ========================================

    /// Transport callback for an inbound payload.
    ///
    /// Every message refreshes the sender's liveness. A rejected message is
    /// answered with a `rejected` message to the sender.
    pub async fn handle_message(
        &self,
        sender: ParticipantId,
        payload: &[u8],
    ) -> Result<(), CoordinatorError> {
        let result = self.dispatch(sender, payload).await;
        if let Err(e) = &result {
            tracing::warn!(participant = %sender, error = %e, "message rejected");
            self.notify(
                sender,
                &ServerMessage::Rejected {
                    reason: e.to_string(),
                },
            )
            .await;
        }
        result
    }

    async fn dispatch(&self, sender: ParticipantId, payload: &[u8]) -> Result<(), CoordinatorError> {
        self.heartbeat(sender).await?;
        let message: ClientMessage =
            codec::decode(payload).map_err(|e| CoordinatorError::Malformed(e.to_string()))?;
        tracing::debug!(participant = %sender, ?message, "message received");

        match message {
            ClientMessage::JoinRequest {
                room,
                capacity,
                empty_ttl_ms,
            } => {
                let room = room.map(RoomName::new).transpose()?;
                let empty_ttl = empty_ttl_ms.map(Duration::from_millis);
                self.request_join_or_create(sender, room, capacity, empty_ttl)
                    .await?;
            }
            ClientMessage::LeaveRequest => {
                self.leave_current(sender).await;
            }
            ClientMessage::ReadyToggle { ready } => {
                let room = self.current_room(sender).await?;
                self.set_ready(sender, &room, ready).await?;
            }
            ClientMessage::ChatPost { text } => {
                self.send_chat(sender, &text).await?;
            }
            ClientMessage::Heartbeat => {}
        }
        Ok(())
    }

    /// Remove expired rooms and disconnect silent participants.
    ///
    /// A silent participant goes through the same path as an explicit
    /// disconnect, so its connection is closed too.
    pub async fn sweep(&self) -> SweepReport {
        let sweep = SweepUseCase::new(
            self.rooms.clone(),
            self.participants.clone(),
            self.config.liveness_timeout,
        );
        let now = Instant::now();
        let expired_rooms = self.publish(sweep.expire_rooms(now).await).await;

        let mut disconnected = Vec::new();
        for participant in sweep.stale_participants(now).await {
            tracing::info!(%participant, "participant timed out");
            if self.disconnect(participant).await {
                disconnected.push(participant);
            }
        }

        SweepReport {
            expired_rooms,
            disconnected,
        }
    }

    /// Run `sweep` every `sweep_interval` until the handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let period = coordinator.config.sweep_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let report = coordinator.sweep().await;
                if !report.expired_rooms.is_empty() || !report.disconnected.is_empty() {
                    tracing::debug!(
                        expired_rooms = report.expired_rooms.len(),
                        disconnected = report.disconnected.len(),
                        "sweep finished"
                    );
                }
            }
        })
    }

    // ========================================
    // Delivery
    // ========================================

    async fn current_room(&self, participant: ParticipantId) -> Result<RoomName, CoordinatorError> {
        let participant_state = self
            .participants
            .get(participant)
            .await
            .ok_or(CoordinatorError::UnknownParticipant(participant))?;
        participant_state
            .room
            .ok_or_else(|| RoomError::NotAMember(participant).into())
    }

    /// Emit the outcome's events and deliver their messages, returning its value.
    ///
    /// The room's publish ticket is held until every message is handed to the
    /// transport.
    async fn publish<T>(&self, outcome: Outcome<T>) -> T {
        let Outcome {
            value,
            notifications,
            ticket,
        } = outcome;
        for Notification { event, recipients } in notifications {
            if let (Some(room), Some(message)) = (event.room_name(), server_message(&event))
                && !recipients.is_empty()
            {
                self.deliver(room, &recipients, &message).await;
            }
            // 購読者がいない場合の送信エラーは無視する
            let _ = self.events.send(event);
        }
        drop(ticket);
        value
    }

    async fn deliver(&self, room: &RoomName, recipients: &[ParticipantId], message: &ServerMessage) {
        let payload = match codec::encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(%room, error = %e, "failed to encode message");
                return;
            }
        };
        if let Err(e) = self.transport.broadcast(room, recipients, payload).await {
            tracing::warn!(%room, error = %e, "broadcast not fully delivered");
        }
    }

    async fn notify(&self, participant: ParticipantId, message: &ServerMessage) {
        let payload = match codec::encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(%participant, error = %e, "failed to encode message");
                return;
            }
        };
        if let Err(e) = self.transport.send_to(participant, payload).await {
            tracing::warn!(%participant, error = %e, "message not delivered");
        }
    }
}

/// The message clients receive for an event, if any.
fn server_message(event: &CoordinatorEvent) -> Option<ServerMessage> {
    match event {
        CoordinatorEvent::RoomJoined { room, .. }
        | CoordinatorEvent::RoomLeft { room, .. }
        | CoordinatorEvent::ReadyChanged { room, .. } => {
            Some(ServerMessage::RoomState { room: room.clone() })
        }
        CoordinatorEvent::GameStart { room } => Some(ServerMessage::StartSignal {
            room: room.name.clone(),
            members: room.member_ids(),
        }),
        CoordinatorEvent::ChatPosted { room, message } => Some(ServerMessage::ChatPost {
            room: room.clone(),
            message: message.clone(),
        }),
        CoordinatorEvent::ParticipantDisconnected { .. } | CoordinatorEvent::RoomRemoved { .. } => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{
        RemovalReason, RoomPhase, TransportError, transport::MockMessagingTransport,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - Coordinator のファサード API（参加・準備完了・チャット・切断・掃除）
    // - イベントの発行とトランスポートへの配送
    //
    // 【なぜこのテストが必要か】
    // - 開始が並行操作の下でも 1 度だけ通知されることを保証する
    // - 切断や TTL による削除が明示的な操作と同じ結果になることを確認する
    // - 配送の失敗が操作の結果に影響しないことを確認する
    // ========================================

    /// 配送されたメッセージを記録するトランスポート
    #[derive(Default)]
    struct RecordingTransport {
        sent: StdMutex<Vec<(Vec<ParticipantId>, ServerMessage)>>,
        closed: StdMutex<Vec<ParticipantId>>,
        /// 誰かが準備完了した FullNotReady の room-state の配送をこの時間だけ遅らせる
        slow_ready_state: Option<Duration>,
    }

    impl RecordingTransport {
        fn received_by(&self, participant: ParticipantId) -> Vec<ServerMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(recipients, _)| recipients.contains(&participant))
                .map(|(_, message)| message.clone())
                .collect()
        }

        fn slow() -> Self {
            Self {
                slow_ready_state: Some(Duration::from_millis(200)),
                ..Default::default()
            }
        }

        fn delivered(&self) -> Vec<ServerMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, message)| message.clone())
                .collect()
        }

        fn closed(&self) -> Vec<ParticipantId> {
            self.closed.lock().unwrap().clone()
        }

        fn start_signals(&self) -> Vec<(Vec<ParticipantId>, ServerMessage)> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, message)| matches!(message, ServerMessage::StartSignal { .. }))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl MessagingTransport for RecordingTransport {
        async fn send_to(
            &self,
            participant: ParticipantId,
            payload: Vec<u8>,
        ) -> Result<(), TransportError> {
            let message = codec::decode(&payload).unwrap();
            self.sent.lock().unwrap().push((vec![participant], message));
            Ok(())
        }

        async fn broadcast(
            &self,
            _room: &RoomName,
            recipients: &[ParticipantId],
            payload: Vec<u8>,
        ) -> Result<(), TransportError> {
            let message: ServerMessage = codec::decode(&payload).unwrap();
            if let (Some(delay), ServerMessage::RoomState { room }) =
                (self.slow_ready_state, &message)
                && room.phase == RoomPhase::FullNotReady
                && room.members.iter().any(|m| m.ready)
            {
                tokio::time::sleep(delay).await;
            }
            self.sent.lock().unwrap().push((recipients.to_vec(), message));
            Ok(())
        }

        async fn close(&self, participant: ParticipantId) {
            self.closed.lock().unwrap().push(participant);
        }
    }

    fn coordinator(config: CoordinatorConfig) -> (Arc<Coordinator>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let coordinator = Arc::new(Coordinator::new(config, transport.clone()));
        (coordinator, transport)
    }

    async fn register(coordinator: &Coordinator, name: &str) -> ParticipantId {
        coordinator
            .register_participant(DisplayName::new(name).unwrap())
            .await
            .unwrap()
            .id
    }

    fn arena() -> RoomName {
        RoomName::new("arena").unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<CoordinatorEvent>) -> Vec<CoordinatorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn count_starts(events: &[CoordinatorEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, CoordinatorEvent::GameStart { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_two_players_ready_start_once() {
        // テスト項目: 定員 2 で A と B が参加し両者が準備完了すると、開始が 1 度だけ通知される
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let mut events = coordinator.subscribe();
        let a = register(&coordinator, "alice").await;
        let b = register(&coordinator, "bob").await;
        coordinator.create_room(arena(), 2).await.unwrap();
        coordinator.join_room(a, &arena()).await.unwrap();
        coordinator.join_room(b, &arena()).await.unwrap();

        // when (操作):
        coordinator.set_ready(a, &arena(), true).await.unwrap();
        let snapshot = coordinator.set_ready(b, &arena(), true).await.unwrap();
        let late = coordinator.toggle_ready(a, &arena()).await;

        // then (期待する結果):
        assert_eq!(snapshot.phase, RoomPhase::Started);
        assert_eq!(count_starts(&drain(&mut events)), 1);
        assert_eq!(
            late.unwrap_err(),
            CoordinatorError::Room(RoomError::AlreadyStarted)
        );
        let signals = transport.start_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(
            signals[0],
            (
                vec![a, b],
                ServerMessage::StartSignal {
                    room: arena(),
                    members: vec![a, b],
                }
            )
        );
    }

    #[tokio::test]
    async fn test_disconnect_reverts_to_forming() {
        // テスト項目: 定員 2 で A と B が参加中に A が切断すると Forming に戻り、B の準備状態は残る
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        let b = register(&coordinator, "bob").await;
        coordinator.create_room(arena(), 2).await.unwrap();
        coordinator.join_room(a, &arena()).await.unwrap();
        coordinator.join_room(b, &arena()).await.unwrap();
        coordinator.set_ready(b, &arena(), true).await.unwrap();
        let mut events = coordinator.subscribe();

        // when (操作):
        coordinator.on_disconnect(a).await;

        // then (期待する結果):
        let snapshot = coordinator.room_snapshot(&arena()).await.unwrap();
        assert_eq!(snapshot.phase, RoomPhase::Forming);
        assert_eq!(snapshot.member_ids(), vec![b]);
        assert!(snapshot.members[0].ready);

        let events = drain(&mut events);
        assert!(matches!(
            events[0],
            CoordinatorEvent::RoomLeft { participant, .. } if participant == a
        ));
        assert!(matches!(
            events[1],
            CoordinatorEvent::ParticipantDisconnected { participant, .. } if participant == a
        ));
        assert!(matches!(
            transport.received_by(b).last(),
            Some(ServerMessage::RoomState { room }) if room.member_ids() == vec![b]
        ));
        assert!(!coordinator.disconnect(a).await);
    }

    #[tokio::test]
    async fn test_membership_never_exceeds_capacity() {
        // テスト項目: 定員 C のルームに C+1 人目が参加すると Full で拒否される
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        coordinator.create_room(arena(), 3).await.unwrap();
        for i in 0..3 {
            let id = register(&coordinator, &format!("p{i}")).await;
            coordinator.join_room(id, &arena()).await.unwrap();
        }
        let extra = register(&coordinator, "extra").await;

        // when (操作):
        let result = coordinator.join_room(extra, &arena()).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(CoordinatorError::Room(RoomError::Full { capacity: 3, .. }))
        ));
        assert_eq!(coordinator.list_rooms().await[0].member_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_empty_and_rate_limited() {
        // テスト項目: 空メッセージは EmptyMessage、クールダウン中の連投は RateLimited になる
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        let b = register(&coordinator, "bob").await;
        coordinator
            .request_join_or_create(a, Some(arena()), Some(2), None)
            .await
            .unwrap();
        coordinator
            .request_join_or_create(b, Some(arena()), None, None)
            .await
            .unwrap();

        // when (操作):
        let empty = coordinator.post(&arena(), a, "").await;
        let blank = coordinator.post(&arena(), a, "   ").await;
        let first = coordinator.post(&arena(), a, "hi").await;
        let second = coordinator.post(&arena(), a, "hi").await;
        tokio::time::advance(Duration::from_millis(1200)).await;
        let third = coordinator.send_chat(a, "hi again").await;

        // then (期待する結果):
        assert_eq!(
            empty.unwrap_err(),
            CoordinatorError::Room(RoomError::EmptyMessage)
        );
        assert_eq!(
            blank.unwrap_err(),
            CoordinatorError::Room(RoomError::EmptyMessage)
        );
        assert_eq!(first.unwrap().value(), 1);
        assert!(matches!(
            second,
            Err(CoordinatorError::Room(RoomError::RateLimited { .. }))
        ));
        assert_eq!(third.unwrap().sequence.value(), 2);

        // 投稿者自身にも配送される
        let chats: Vec<ServerMessage> = transport
            .received_by(a)
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::ChatPost { .. }))
            .collect();
        assert_eq!(chats.len(), 2);
        let history = coordinator.history(&arena()).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_handle_message_join_and_chat() {
        // テスト項目: クライアントメッセージで参加・準備完了・チャットが行われる
        // given (前提条件):
        let config = CoordinatorConfig {
            chat: crate::domain::ChatPolicy {
                cooldown: None,
                ..Default::default()
            },
            ..Default::default()
        };
        let (coordinator, transport) = coordinator(config);
        let a = register(&coordinator, "alice").await;

        // when (操作):
        coordinator
            .handle_message(a, br#"{"type":"join-request","room":"arena","capacity":1}"#)
            .await
            .unwrap();
        coordinator
            .handle_message(a, br#"{"type":"chat-post","text":"hello"}"#)
            .await
            .unwrap();
        coordinator
            .handle_message(a, br#"{"type":"ready-toggle","ready":true}"#)
            .await
            .unwrap();
        coordinator
            .handle_message(a, br#"{"type":"heartbeat"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        let received = transport.received_by(a);
        assert!(matches!(received[0], ServerMessage::RoomState { .. }));
        assert!(matches!(
            &received[1],
            ServerMessage::ChatPost { message, .. } if message.text.as_str() == "hello"
        ));
        assert!(matches!(received.last(), Some(ServerMessage::StartSignal { .. })));
    }

    #[tokio::test]
    async fn test_handle_message_rejected() {
        // テスト項目: 不正なメッセージや拒否された操作は rejected で送信者に通知される
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;

        // when (操作):
        let malformed = coordinator.handle_message(a, b"not json").await;
        let not_member = coordinator
            .handle_message(a, br#"{"type":"chat-post","text":"hi"}"#)
            .await;
        let unknown = coordinator
            .handle_message(ParticipantId::new(999), br#"{"type":"heartbeat"}"#)
            .await;

        // then (期待する結果):
        assert!(matches!(malformed, Err(CoordinatorError::Malformed(_))));
        assert_eq!(
            not_member.unwrap_err(),
            CoordinatorError::Room(RoomError::NotAMember(a))
        );
        assert_eq!(
            unknown.unwrap_err(),
            CoordinatorError::UnknownParticipant(ParticipantId::new(999))
        );
        let rejected = transport
            .received_by(a)
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::Rejected { .. }))
            .count();
        assert_eq!(rejected, 2);
    }

    #[tokio::test]
    async fn test_join_or_create_without_name_generates_room() {
        // テスト項目: ルーム名なしの参加要求では生成されたルームに参加する
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;

        // when (操作):
        let snapshot = coordinator.request_join_or_create(a, None, None, None).await.unwrap();

        // then (期待する結果):
        assert!(snapshot.name.as_str().starts_with("room-"));
        assert_eq!(snapshot.capacity, 2);
        assert_eq!(snapshot.member_ids(), vec![a]);
    }

    #[tokio::test]
    async fn test_join_or_create_already_in_room_creates_nothing() {
        // テスト項目: 既にルームにいる参加者の参加要求は、ルームを作らずに拒否される
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        coordinator
            .request_join_or_create(a, Some(arena()), None, None)
            .await
            .unwrap();

        // when (操作):
        let result = coordinator
            .request_join_or_create(a, Some(RoomName::new("other").unwrap()), None, None)
            .await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            CoordinatorError::Room(RoomError::AlreadyInRoom(arena()))
        );
        assert_eq!(coordinator.list_rooms().await.len(), 1);
    }

    #[tokio::test]
    async fn test_server_full() {
        // テスト項目: 同時接続数の上限を超える登録は ServerFull で拒否される
        // given (前提条件):
        let config = CoordinatorConfig {
            max_participants: Some(1),
            ..Default::default()
        };
        let (coordinator, _) = coordinator(config);
        register(&coordinator, "alice").await;

        // when (操作):
        let result = coordinator
            .register_participant(DisplayName::new("bob").unwrap())
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), CoordinatorError::ServerFull { max: 1 });
    }

    #[tokio::test]
    async fn test_close_room_detaches_members() {
        // テスト項目: ルームを閉じるとメンバーが切り離され、別のルームに参加できるようになる
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        coordinator
            .request_join_or_create(a, Some(arena()), None, None)
            .await
            .unwrap();
        let mut events = coordinator.subscribe();

        // when (操作):
        coordinator.close_room(&arena()).await.unwrap();

        // then (期待する結果):
        assert!(
            drain(&mut events).contains(&CoordinatorEvent::RoomRemoved {
                room: arena(),
                reason: RemovalReason::Closed,
            })
        );
        assert!(coordinator.room_snapshot(&arena()).await.is_err());
        let other = RoomName::new("other").unwrap();
        assert!(coordinator.request_join_or_create(a, Some(other), None, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_room_open() {
        // テスト項目: 参加受付を閉じたルームには参加できず、開き直すと参加できる
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        coordinator.create_room(arena(), 2).await.unwrap();

        // when (操作):
        coordinator.set_room_open(&arena(), false).await.unwrap();
        let closed = coordinator.join_room(a, &arena()).await;
        coordinator.set_room_open(&arena(), true).await.unwrap();
        let reopened = coordinator.join_room(a, &arena()).await;

        // then (期待する結果):
        assert_eq!(
            closed.unwrap_err(),
            CoordinatorError::Room(RoomError::Closed(arena()))
        );
        assert!(reopened.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expires_rooms_and_silent_participants() {
        // テスト項目: 掃除で期限切れのルームが削除され、応答のない参加者が切断される
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        coordinator.create_room(arena(), 2).await.unwrap();
        let mut events = coordinator.subscribe();

        // when (操作):
        tokio::time::advance(Duration::from_millis(1000)).await;
        let rooms = coordinator.sweep().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        let participants = coordinator.sweep().await;

        // then (期待する結果):
        assert_eq!(rooms.expired_rooms, vec![arena()]);
        assert!(rooms.disconnected.is_empty());
        assert_eq!(participants.disconnected, vec![a]);
        assert_eq!(transport.closed(), vec![a]);
        let events = drain(&mut events);
        assert!(events.contains(&CoordinatorEvent::RoomRemoved {
            room: arena(),
            reason: RemovalReason::Expired,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_keeps_participant_alive() {
        // テスト項目: ハートビートを送り続ける参加者は切断されない
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;

        // when (操作):
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(20)).await;
            coordinator.heartbeat(a).await.unwrap();
        }
        let report = coordinator.sweep().await;

        // then (期待する結果):
        assert!(report.disconnected.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_sweeper_removes_expired_room() {
        // テスト項目: バックグラウンドの掃除タスクが期限切れのルームを削除する
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        coordinator.create_room(arena(), 2).await.unwrap();
        let sweeper = coordinator.spawn_sweeper();

        // when (操作):
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // then (期待する結果):
        assert!(coordinator.list_rooms().await.is_empty());
        sweeper.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ready_emits_single_start() {
        // テスト項目: 全員が並行して準備完了を送っても GameStart は 1 度だけ
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let mut events = coordinator.subscribe();
        coordinator.create_room(arena(), 6).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..6 {
            let id = register(&coordinator, &format!("p{i}")).await;
            coordinator.join_room(id, &arena()).await.unwrap();
            ids.push(id);
        }

        // when (操作):
        let tasks: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.set_ready(id, &arena(), true).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // then (期待する結果):
        assert_eq!(count_starts(&drain(&mut events)), 1);
        assert_eq!(transport.start_signals().len(), 1);
    }

    #[tokio::test]
    async fn test_start_signal_through_mock_transport() {
        // テスト項目: 定員 1 で作成者自動準備完了の場合、参加と同時に開始シグナルが 1 度だけ配送される
        // given (前提条件):
        let mut transport = MockMessagingTransport::new();
        transport
            .expect_broadcast()
            .withf(|_, _, payload| {
                matches!(
                    codec::decode::<ServerMessage>(payload),
                    Ok(ServerMessage::RoomState { .. })
                )
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        transport
            .expect_broadcast()
            .withf(|room, recipients, payload| {
                room.as_str() == "solo"
                    && recipients.len() == 1
                    && matches!(
                        codec::decode::<ServerMessage>(payload),
                        Ok(ServerMessage::StartSignal { .. })
                    )
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let config = CoordinatorConfig {
            creator_auto_ready: true,
            ..Default::default()
        };
        let coordinator = Coordinator::new(config, Arc::new(transport));
        let a = register(&coordinator, "alice").await;

        // when (操作):
        let snapshot = coordinator
            .request_join_or_create(a, Some(RoomName::new("solo").unwrap()), Some(1), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.phase, RoomPhase::Started);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        // テスト項目: 配送に失敗しても操作は成功し、再送はされない
        // given (前提条件):
        let mut transport = MockMessagingTransport::new();
        transport
            .expect_broadcast()
            .times(1)
            .returning(|_, recipients, _| Err(TransportError::Unreachable(recipients[0])));
        let coordinator = Coordinator::new(CoordinatorConfig::default(), Arc::new(transport));
        let a = register(&coordinator, "alice").await;
        coordinator.create_room(arena(), 2).await.unwrap();

        // when (操作):
        let result = coordinator.join_room(a, &arena()).await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_delivery_keeps_room_order() {
        // テスト項目: 先の更新の配送が遅れても、同じルームの後の更新はその後に配送される
        // given (前提条件):
        let transport = Arc::new(RecordingTransport::slow());
        let coordinator = Arc::new(Coordinator::new(
            CoordinatorConfig::default(),
            transport.clone(),
        ));
        let mut events = coordinator.subscribe();
        let a = register(&coordinator, "alice").await;
        let b = register(&coordinator, "bob").await;
        coordinator.create_room(arena(), 2).await.unwrap();
        coordinator.join_room(a, &arena()).await.unwrap();
        coordinator.join_room(b, &arena()).await.unwrap();
        drain(&mut events);

        // when (操作):
        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.set_ready(a, &arena(), true).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = coordinator.set_ready(b, &arena(), true).await.unwrap();
        first.await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(second.phase, RoomPhase::Started);
        let phases: Vec<Option<RoomPhase>> = transport
            .delivered()
            .iter()
            .rev()
            .take(3)
            .rev()
            .map(|m| match m {
                ServerMessage::RoomState { room } => Some(room.phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![Some(RoomPhase::FullNotReady), Some(RoomPhase::Started), None]
        );
        assert!(matches!(
            transport.delivered().last(),
            Some(ServerMessage::StartSignal { .. })
        ));

        let events = drain(&mut events);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            CoordinatorEvent::ReadyChanged { room, .. } if room.phase == RoomPhase::FullNotReady
        ));
        assert!(matches!(
            &events[1],
            CoordinatorEvent::ReadyChanged { room, .. } if room.phase == RoomPhase::Started
        ));
        assert!(matches!(events[2], CoordinatorEvent::GameStart { .. }));
    }

    #[tokio::test]
    async fn test_join_request_with_huge_capacity_rejected() {
        // テスト項目: 上限を超える定員の参加要求は InvalidCapacity で拒否され、ルームは作られない
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;

        // when (操作):
        let result = coordinator
            .handle_message(
                a,
                br#"{"type":"join-request","room":"huge","capacity":18446744073709551615}"#,
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            CoordinatorError::Room(RoomError::InvalidCapacity(usize::MAX))
        );
        assert!(coordinator.list_rooms().await.is_empty());
        assert!(matches!(
            transport.received_by(a).last(),
            Some(ServerMessage::Rejected { .. })
        ));
        assert!(
            coordinator
                .request_join_or_create(a, Some(arena()), Some(2), None)
                .await
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_or_create_with_own_empty_ttl() {
        // テスト項目: 参加要求で指定した TTL がそのルームだけに適用される
        // given (前提条件):
        let (coordinator, _) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        let b = register(&coordinator, "bob").await;
        let lasting = RoomName::new("lasting").unwrap();
        coordinator
            .request_join_or_create(a, Some(arena()), None, None)
            .await
            .unwrap();
        coordinator
            .handle_message(
                b,
                br#"{"type":"join-request","room":"lasting","empty_ttl_ms":5000}"#,
            )
            .await
            .unwrap();
        coordinator.leave_room(a, &arena()).await;
        coordinator.leave_room(b, &lasting).await;

        // when (操作):
        tokio::time::advance(Duration::from_millis(1000)).await;
        let early = coordinator.sweep().await;
        tokio::time::advance(Duration::from_millis(4000)).await;
        let late = coordinator.sweep().await;

        // then (期待する結果):
        assert_eq!(early.expired_rooms, vec![arena()]);
        assert_eq!(late.expired_rooms, vec![lasting]);
    }

    #[tokio::test]
    async fn test_explicit_disconnect_closes_connection() {
        // テスト項目: Coordinator からの切断は接続も閉じるが、接続側からの切断通知は閉じ直さない
        // given (前提条件):
        let (coordinator, transport) = coordinator(CoordinatorConfig::default());
        let a = register(&coordinator, "alice").await;
        let b = register(&coordinator, "bob").await;

        // when (操作):
        coordinator.disconnect(a).await;
        coordinator.on_disconnect(b).await;

        // then (期待する結果):
        assert_eq!(transport.closed(), vec![a]);
        assert!(!coordinator.disconnect(b).await);
    }
}
