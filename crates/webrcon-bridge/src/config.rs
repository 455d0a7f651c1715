//! Bridge configuration

use std::time::Duration;
use webrcon_core::EventKind;

/// Shortest allowed status poll interval (chat platform presence rate limit)
pub const MIN_STATUS_INTERVAL: Duration = Duration::from_secs(15);

/// Connection parameters for the WebRCON endpoint
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Game server host
    pub host: String,
    /// WebRCON port
    pub port: u16,
    /// Shared secret, sent as the URL path segment
    pub secret: String,
    /// Deadline for a single frame write
    pub write_timeout: Duration,
    /// How long the peer may stay silent before the link is considered dead
    pub pong_timeout: Duration,
    /// Pause after a disconnect notice so it reaches the chat side
    pub disconnect_grace: Duration,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16, secret: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// `ws://{host}:{port}/{secret}`
    pub fn url(&self) -> String {
        format!("ws://{}:{}/{}", self.host, self.port, self.secret)
    }

    /// Keepalive period, 9/10 of the pong window
    pub fn ping_period(&self) -> Duration {
        self.pong_timeout * 9 / 10
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 28016,
            secret: String::new(),
            write_timeout: Duration::from_secs(10),
            pong_timeout: Duration::from_secs(60),
            disconnect_grace: Duration::from_secs(1),
        }
    }
}

/// Which death events are relayed to the chat side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillFeed {
    pub pvp: bool,
    pub other: bool,
}

impl KillFeed {
    /// Whether an event of `kind` passes the kill-feed toggles
    pub fn allows(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Kill => self.pvp,
            EventKind::Death => self.other,
            _ => true,
        }
    }
}

/// Output channel overrides for the chat side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRoutes {
    pub chat: Option<String>,
    pub killfeed: Option<String>,
    pub notifications: Option<String>,
    pub playerlist: Option<String>,
}

impl ChannelRoutes {
    /// Resolve the target channel for an event kind
    pub fn channel_for(&self, kind: EventKind) -> Option<String> {
        let chat = || self.chat.clone();
        match kind {
            EventKind::Kill | EventKind::Death => self.killfeed.clone().or_else(chat),
            EventKind::Join | EventKind::Leave => self.notifications.clone().or_else(chat),
            EventKind::RosterChanged => self.playerlist.clone(),
            EventKind::Status => None,
            EventKind::Chat | EventKind::ServerConnected | EventKind::ServerDisconnected => chat(),
        }
    }
}

/// Everything the bridge needs at startup
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub connection: ConnectionConfig,
    /// Status poll interval, clamped to [`MIN_STATUS_INTERVAL`]
    pub status_interval: Duration,
    /// Tag prepended to relayed chat lines
    pub relay_prefix: String,
    pub kill_feed: KillFeed,
    pub routes: ChannelRoutes,
}

impl BridgeConfig {
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            status_interval: MIN_STATUS_INTERVAL,
            relay_prefix: "[DISCORD]".to_string(),
            kill_feed: KillFeed::default(),
            routes: ChannelRoutes::default(),
        }
    }

    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Effective poll interval
    pub fn poll_interval(&self) -> Duration {
        self.status_interval.max(MIN_STATUS_INTERVAL)
    }
}
