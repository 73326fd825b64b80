//! Bounded per-room chat history with per-sender cooldown.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{
    error::RoomError,
    value_object::{DisplayName, MessageText, ParticipantId, SequenceNumber, Timestamp},
};

/// Default number of retained messages per room
pub const DEFAULT_MESSAGE_CAP: usize = 25;

/// Default minimum interval between two posts from the same sender
pub const DEFAULT_POST_COOLDOWN: Duration = Duration::from_millis(1200);

/// A chat message as retained in the log and broadcast to members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sequence: SequenceNumber,
    pub sender: ParticipantId,
    pub sender_name: DisplayName,
    pub text: MessageText,
    pub posted_at: Timestamp,
}

/// Retention and rate-limit settings of a chat log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPolicy {
    /// Maximum retained messages; the oldest is evicted first
    pub message_cap: usize,
    /// Minimum interval between posts per sender, `None` disables rate limiting
    pub cooldown: Option<Duration>,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            message_cap: DEFAULT_MESSAGE_CAP,
            cooldown: Some(DEFAULT_POST_COOLDOWN),
        }
    }
}

/// Ordered, bounded message log of one room.
#[derive(Debug, Clone)]
pub struct ChatLog {
    policy: ChatPolicy,
    messages: VecDeque<ChatMessage>,
    last_sequence: u64,
    next_post_at: HashMap<ParticipantId, Instant>,
}

impl ChatLog {
    /// A cap of zero is treated as one so the latest message is always retained.
    pub fn new(policy: ChatPolicy) -> Self {
        let policy = ChatPolicy {
            message_cap: policy.message_cap.max(1),
            ..policy
        };
        Self {
            policy,
            messages: VecDeque::with_capacity(policy.message_cap),
            last_sequence: 0,
            next_post_at: HashMap::new(),
        }
    }

    pub fn policy(&self) -> ChatPolicy {
        self.policy
    }

    /// Reject the sender if its cooldown has not elapsed yet.
    pub fn check_cooldown(&self, sender: ParticipantId, now: Instant) -> Result<(), RoomError> {
        match self.next_post_at.get(&sender) {
            Some(deadline) if *deadline > now => Err(RoomError::RateLimited {
                retry_after: *deadline - now,
            }),
            _ => Ok(()),
        }
    }

    /// Append a message, assigning the next sequence number.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::RateLimited` if the sender posted within the cooldown.
    pub fn append(
        &mut self,
        sender: ParticipantId,
        sender_name: DisplayName,
        text: MessageText,
        now: Instant,
        posted_at: Timestamp,
    ) -> Result<ChatMessage, RoomError> {
        self.check_cooldown(sender, now)?;

        self.last_sequence += 1;
        let message = ChatMessage {
            sequence: SequenceNumber::new(self.last_sequence),
            sender,
            sender_name,
            text,
            posted_at,
        };
        self.messages.push_back(message.clone());
        while self.messages.len() > self.policy.message_cap {
            self.messages.pop_front();
        }

        match self.policy.cooldown {
            Some(cooldown) => {
                self.next_post_at.insert(sender, now + cooldown);
            }
            None => {
                self.next_post_at.remove(&sender);
            }
        }

        Ok(message)
    }

    /// Drop any pending cooldown of the sender.
    pub fn cancel_cooldown(&mut self, sender: ParticipantId) {
        self.next_post_at.remove(&sender);
    }

    pub fn has_cooldown(&self, sender: ParticipantId) -> bool {
        self.next_post_at.contains_key(&sender)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_sequence(&self) -> Option<SequenceNumber> {
        (self.last_sequence > 0).then(|| SequenceNumber::new(self.last_sequence))
    }

    /// Snapshot of the retained messages in ascending sequence order.
    pub fn history(&self) -> History {
        History {
            messages: self.messages.iter().cloned().collect(),
        }
    }
}

/// Retained chat messages of a room, oldest first.
///
/// A snapshot taken under the room lock; it can be iterated any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl IntoIterator for History {
    type Item = ChatMessage;
    type IntoIter = std::vec::IntoIter<ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
