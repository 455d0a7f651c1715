//! Environment configuration

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::time::Duration;
use webrcon_bridge::{BridgeConfig, ChannelRoutes, ConnectionConfig, KillFeed};

/// Startup settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub bridge: BridgeConfig,
    /// Directory of the JSON document store
    pub database_path: PathBuf,
    /// Shut down when stdin reaches EOF instead of only stopping the relay
    pub exit_on_stdin_eof: bool,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{} environment variable is required", key));
        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds", key)),
                None => Ok(Duration::from_secs(default)),
            }
        };
        let enabled = |key: &str| get(key).is_some_and(|value| value.trim() == "true");

        let connection = ConnectionConfig {
            host: required("WEBRCON_HOST")?,
            port: required("WEBRCON_PORT")?
                .trim()
                .parse()
                .context("WEBRCON_PORT must be a valid port number")?,
            secret: required("WEBRCON_PASSWORD")?,
            write_timeout: seconds("WEBRCON_WRITE_TIMEOUT_SECS", 10)?,
            pong_timeout: seconds("WEBRCON_PONG_TIMEOUT_SECS", 60)?,
            ..ConnectionConfig::default()
        };

        let mut bridge = BridgeConfig::new(connection)
            .with_status_interval(seconds("WEBRCON_STATUS_INTERVAL_SECS", 15)?);
        if let Some(prefix) = lookup("WEBRCON_RELAY_PREFIX") {
            bridge.relay_prefix = prefix;
        }
        bridge.kill_feed = KillFeed {
            pvp: enabled("KILLFEED_PVP_ENABLED"),
            other: enabled("KILLFEED_OTHER_ENABLED"),
        };
        bridge.routes = ChannelRoutes {
            chat: get("CHAT_CHANNEL_ID"),
            killfeed: get("KILLFEED_CHANNEL_ID"),
            notifications: get("NOTIFICATIONS_CHANNEL_ID"),
            playerlist: get("PLAYERLIST_CHANNEL_ID"),
        };

        Ok(Self {
            bridge,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".db")),
            exit_on_stdin_eof: enabled("EXIT_ON_STDIN_EOF"),
        })
    }
}
