//! Domain events produced from server frames, and the flattened event stream
//! exposed to the chat side

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::status::{PlayerInfo, StatusSnapshot};

/// In-game chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub username: String,
    pub user_id: u64,
    pub text: String,
    pub color: Option<String>,
    pub timestamp: u64,
}

/// Whether a player joined or left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    Join,
    Leave,
}

/// Join/leave line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub ip: String,
    pub port: String,
    pub user_id: u64,
    pub username: String,
    pub os: Option<String>,
    /// Trailing reason on disconnect lines
    pub detail: Option<String>,
    pub kind: PresenceKind,
}

/// Verb of a death line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathVerb {
    KilledBy,
    Died,
}

impl DeathVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            DeathVerb::KilledBy => "was killed by",
            DeathVerb::Died => "died",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "was killed by" => Some(DeathVerb::KilledBy),
            "died" => Some(DeathVerb::Died),
            _ => None,
        }
    }
}

/// Normalized death line.
///
/// Exactly one of `killer_name` or `reason` is set: PvP deaths carry the
/// killer, everything else carries a lower-cased reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathEvent {
    pub victim_name: String,
    pub victim_id: Option<String>,
    pub how: DeathVerb,
    pub killer_name: Option<String>,
    pub killer_id: Option<String>,
    pub reason: Option<String>,
    pub is_pvp: bool,
}

impl DeathEvent {
    /// Human-readable death line
    pub fn message(&self) -> String {
        match (&self.killer_name, &self.reason, self.how) {
            (Some(killer), None, how) => {
                format!("{} {} {}", self.victim_name, how.as_str(), killer)
            }
            (_, Some(reason), DeathVerb::Died) => {
                format!("{} died from {}", self.victim_name, reason)
            }
            (_, Some(reason), how) => {
                format!("{} {} {}", self.victim_name, how.as_str(), reason)
            }
            (None, None, how) => format!("{} {}", self.victim_name, how.as_str()),
        }
    }
}

/// Typed event produced by the classifier
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Chat(ChatEvent),
    Presence(PresenceEvent),
    Death(DeathEvent),
    /// Roster parsed from a status frame (possibly empty)
    RosterChanged {
        hostname: String,
        players: Vec<PlayerInfo>,
    },
    /// Full status snapshot
    Status(StatusSnapshot),
}

impl DomainEvent {
    /// Flatten into the chat-facing event shape
    pub fn to_bridge_event(&self) -> Result<BridgeEvent> {
        let event = match self {
            DomainEvent::Chat(chat) => {
                BridgeEvent::new(EventKind::Chat, &chat.username, &chat.text)
            }
            DomainEvent::Presence(presence) => match presence.kind {
                PresenceKind::Join => BridgeEvent::new(EventKind::Join, &presence.username, "joined"),
                PresenceKind::Leave => BridgeEvent::new(EventKind::Leave, &presence.username, "left"),
            },
            DomainEvent::Death(death) => {
                let kind = if death.is_pvp {
                    EventKind::Kill
                } else {
                    EventKind::Death
                };
                BridgeEvent::new(kind, "", death.message())
            }
            DomainEvent::RosterChanged { hostname, players } => BridgeEvent::new(
                EventKind::RosterChanged,
                hostname,
                serde_json::to_string(players)?,
            ),
            DomainEvent::Status(snapshot) => {
                BridgeEvent::new(EventKind::Status, &snapshot.hostname, snapshot.summary())
            }
        };
        Ok(event)
    }
}

/// Kind of a chat-facing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Chat,
    Join,
    Leave,
    /// PvP death
    Kill,
    /// Environmental or NPC death
    Death,
    Status,
    RosterChanged,
    ServerConnected,
    ServerDisconnected,
}

/// Event pushed to the chat side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub kind: EventKind,
    pub actor: String,
    pub text: String,
    /// Output channel resolved from the routing table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl BridgeEvent {
    pub fn new(kind: EventKind, actor: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            actor: actor.into(),
            text: text.into(),
            channel: None,
        }
    }

    /// Lifecycle notice without an actor
    pub fn notice(kind: EventKind, text: impl Into<String>) -> Self {
        Self::new(kind, "", text)
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel = channel;
        self
    }
}

/// Chat line produced by the chat side, relayed to the game server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingChat {
    pub actor: String,
    pub text: String,
}
