//! Coordinator and server configuration.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;

use crate::domain::{
    ChatPolicy,
    chat::{DEFAULT_MESSAGE_CAP, DEFAULT_POST_COOLDOWN},
    entity::DEFAULT_EMPTY_ROOM_TTL,
};

/// Default room capacity when a join request does not name one
pub const DEFAULT_ROOM_CAPACITY: usize = 2;
/// Largest capacity a room may be created with
pub const DEFAULT_MAX_ROOM_CAPACITY: usize = 16;
/// Default silence after which a participant is considered gone
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_EVENT_BUFFER: usize = 256;
/// Concurrent participant cap of the bundled server
pub const DEFAULT_MAX_PARTICIPANTS: usize = 20;

/// Deployment policy of the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Capacity of rooms created by a join request without a capacity
    pub default_capacity: usize,
    /// Requests for larger rooms fail with `InvalidCapacity`
    pub max_capacity: usize,
    /// How long an empty room survives unless the creator asks otherwise
    pub empty_room_ttl: Duration,
    pub chat: ChatPolicy,
    /// Whether the first member of a room starts out ready
    pub creator_auto_ready: bool,
    /// Cap on concurrently registered participants, `None` for unlimited
    pub max_participants: Option<usize>,
    pub liveness_timeout: Duration,
    pub sweep_interval: Duration,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_ROOM_CAPACITY,
            max_capacity: DEFAULT_MAX_ROOM_CAPACITY,
            empty_room_ttl: DEFAULT_EMPTY_ROOM_TTL,
            chat: ChatPolicy::default(),
            creator_auto_ready: false,
            max_participants: None,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Command line arguments of the readyroom server
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Room membership and readiness coordinator")]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "debug")]
    pub log_level: String,

    /// Capacity of rooms created without an explicit capacity
    #[arg(long, default_value_t = DEFAULT_ROOM_CAPACITY)]
    pub default_capacity: usize,

    /// Largest room capacity a client may request
    #[arg(long, default_value_t = DEFAULT_MAX_ROOM_CAPACITY)]
    pub max_capacity: usize,

    /// Empty room TTL in milliseconds
    #[arg(long, default_value_t = DEFAULT_EMPTY_ROOM_TTL.as_millis() as u64)]
    pub empty_room_ttl_ms: u64,

    /// Number of chat messages retained per room
    #[arg(long, default_value_t = DEFAULT_MESSAGE_CAP)]
    pub message_cap: usize,

    /// Per-sender chat cooldown in milliseconds, 0 disables rate limiting
    #[arg(long, default_value_t = DEFAULT_POST_COOLDOWN.as_millis() as u64)]
    pub chat_cooldown_ms: u64,

    /// Mark the first member of a room as ready
    #[arg(long)]
    pub creator_auto_ready: bool,

    /// Maximum concurrently connected participants, 0 for unlimited
    #[arg(long, default_value_t = DEFAULT_MAX_PARTICIPANTS)]
    pub max_participants: usize,

    /// Liveness timeout in seconds
    #[arg(long, default_value_t = DEFAULT_LIVENESS_TIMEOUT.as_secs())]
    pub liveness_timeout_secs: u64,

    /// Sweeper interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_millis() as u64)]
    pub sweep_interval_ms: u64,
}

impl ServerArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr().parse()
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            default_capacity: self.default_capacity,
            max_capacity: self.max_capacity,
            empty_room_ttl: Duration::from_millis(self.empty_room_ttl_ms),
            chat: ChatPolicy {
                message_cap: self.message_cap,
                cooldown: (self.chat_cooldown_ms > 0)
                    .then(|| Duration::from_millis(self.chat_cooldown_ms)),
            },
            creator_auto_ready: self.creator_auto_ready,
            max_participants: (self.max_participants > 0).then_some(self.max_participants),
            liveness_timeout: Duration::from_secs(self.liveness_timeout_secs),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}
