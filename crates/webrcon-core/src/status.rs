//! Server status snapshot parsed from the `status` console command

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One connected player from the status roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub steam_id: String,
    pub username: String,
    pub ping_ms: u32,
    /// Time since the player connected, serialized as seconds
    #[serde(with = "duration_secs")]
    pub connected_for: Duration,
    pub ip: String,
    pub port: u16,
    /// Owner column; empty on most servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_steam_id: Option<String>,
    pub violations: f64,
    pub kicks: u32,
}

/// Full server status, replaced wholesale on every successful parse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub hostname: String,
    pub version: u32,
    pub secure: String,
    pub map: String,
    pub current_players: u32,
    pub max_players: u32,
    pub queued_players: u32,
    pub joining_players: u32,
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
}

impl StatusSnapshot {
    /// Condensed player count, e.g. `5/64 (2 joining, 3 queued)`
    pub fn summary(&self) -> String {
        let counts = format!("{}/{}", self.current_players, self.max_players);
        match (self.joining_players, self.queued_players) {
            (0, 0) => counts,
            (joining, 0) => format!("{} ({} joining)", counts, joining),
            (0, queued) => format!("{} ({} queued)", counts, queued),
            (joining, queued) => format!("{} ({} joining, {} queued)", counts, joining, queued),
        }
    }
}

/// Serialize a `Duration` as fractional seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
