//! `status` command output: header counts and the player roster

use regex::{Captures, Regex};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{trace, warn};
use webrcon_core::{DomainEvent, PlayerInfo, StatusSnapshot};

/// Header printed by the `status` command
static STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"hostname:[ \t]*(?P<hostname>.*?)[ \t]*\r?\n",
        r".*?version[ \t]*:[ \t]*(?P<version>\d+) .*?secure[ \t]*\((?P<secure>.*?)\)[ \t]*\r?\n",
        r".*?map[ \t]*:[ \t]*(?P<map>.*?)[ \t]*\r?\n",
        r".*?players[ \t]*:[ \t]*(?P<current>\d+) \((?P<max>\d+) max\) \((?P<queued>\d+) queued\) \((?P<joining>\d+) joining\)",
    ))
    .expect("valid regex")
});

/// One roster line; the owner column is usually blank
static ROSTER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?m)^(?P<steam_id>\d+)[ \t]+"(?P<username>.+?)"[ \t]+(?P<ping>\d+)[ \t]+"#,
        r"(?P<connected>[\d.]+)s[ \t]+(?P<ip>[\d.]+):(?P<port>\d+)[ \t]+",
        r"(?:(?P<owner>\d+)[ \t]+)?(?P<violations>[\d.]+)[ \t]+(?P<kicks>\d+)",
    ))
    .expect("valid regex")
});

/// Parse the status header. The roster is left empty.
pub fn parse_header(message: &str) -> Option<StatusSnapshot> {
    let caps = STATUS.captures(message)?;
    let number = |name: &str| caps[name].parse::<u32>().ok();

    let snapshot = StatusSnapshot {
        hostname: caps["hostname"].to_string(),
        version: number("version")?,
        secure: caps["secure"].to_string(),
        map: caps["map"].to_string(),
        current_players: number("current")?,
        max_players: number("max")?,
        queued_players: number("queued")?,
        joining_players: number("joining")?,
        players: Vec::new(),
    };
    Some(snapshot)
}

/// Parse every roster line, keeping at most `slots` players
pub fn parse_roster(message: &str, slots: usize) -> Vec<PlayerInfo> {
    let mut players = Vec::new();

    for (index, caps) in ROSTER_LINE.captures_iter(message).enumerate() {
        if index >= slots {
            warn!(index, slots, line = &caps[0], "Roster line outside the slot count, skipping");
            continue;
        }
        match player(&caps) {
            Some(player) => players.push(player),
            None => warn!(line = &caps[0], "Failed to parse roster line"),
        }
    }

    players
}

fn player(caps: &Captures<'_>) -> Option<PlayerInfo> {
    let connected = caps["connected"].parse::<f64>().ok()?;

    Some(PlayerInfo {
        steam_id: caps["steam_id"].to_string(),
        username: caps["username"].to_string(),
        ping_ms: caps["ping"].parse().ok()?,
        connected_for: Duration::try_from_secs_f64(connected).ok()?,
        ip: caps["ip"].to_string(),
        port: caps["port"].parse().ok()?,
        owner_steam_id: caps.name("owner").map(|m| m.as_str().to_string()),
        violations: caps["violations"].parse().ok()?,
        kicks: caps["kicks"].parse().ok()?,
    })
}

/// Status branch of the cascade: `RosterChanged` followed by `Status`
pub fn match_status(message: &str) -> Option<Vec<DomainEvent>> {
    let mut snapshot = parse_header(message)?;
    snapshot.players = parse_roster(message, snapshot.max_players as usize);
    trace!(
        hostname = %snapshot.hostname,
        players = snapshot.players.len(),
        "Parsed status frame"
    );

    let roster = DomainEvent::RosterChanged {
        hostname: snapshot.hostname.clone(),
        players: snapshot.players.clone(),
    };
    Some(vec![roster, DomainEvent::Status(snapshot)])
}
