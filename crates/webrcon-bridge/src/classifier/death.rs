//! Death log lines and their normalization
//!
//! The server prints deaths as
//! `{victim}[{slot}/{victimId}] (was killed by|died) {killer}[{slot}/{killerId}]`
//! or, for environmental and NPC deaths, with a free-form reason in place of
//! the killer. The raw captures go through a fixed sequence of normalization
//! steps before being resolved into a [`DeathEvent`]:
//!
//! 1. [`strip_ids`]
//! 2. [`strip_killer_parenthetical`]
//! 3. [`strip_reason_parenthetical`]
//! 4. [`normalize_reason`]
//! 5. [`is_npc_on_npc`] (discard)
//! 6. [`rename_npc_killer`]
//! 7. [`normalize_drowning`]
//! 8. [`resolve`]

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};
use webrcon_core::{DeathEvent, DeathVerb, DomainEvent};

/// Label used for NPC killers printed with their id as their name
pub const NPC_KILLER: &str = "a scientist";

static DEATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<victim>.+?)(?:\[(?:[0-9]+?)/(?P<victim_id>[0-9]+?)\])",
        r"(?: (?P<how>was killed by|died) )",
        r"(?P<killer>(?:(?:[^/\[\]]+)\[[0-9]+/(?P<killer_id>[0-9]+)\]$)|(?P<reason>[^/]*$))",
    ))
    .expect("valid regex")
});

static IDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.+?/.+?\]").expect("valid regex"));

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:.+)( \(.+\))").expect("valid regex"));

/// Raw death captures; unmatched groups are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeathCaptures {
    pub victim: String,
    pub victim_id: String,
    pub how: String,
    pub killer: String,
    pub killer_id: String,
    pub reason: String,
}

impl DeathCaptures {
    /// Match a log line against the death pattern
    pub fn capture(line: &str) -> Option<Self> {
        let caps = DEATH.captures(line)?;
        let group = |name: &str| {
            caps.name(name)
                .map_or_else(String::new, |m| m.as_str().to_string())
        };

        Some(Self {
            victim: group("victim"),
            victim_id: group("victim_id"),
            how: group("how"),
            killer: group("killer"),
            killer_id: group("killer_id"),
            reason: group("reason"),
        })
    }
}

/// How a matched death line ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathOutcome {
    Event(DeathEvent),
    /// Non-player killed by a non-player
    NpcDeath,
    /// Neither a killer nor a reason could be resolved
    Unresolved(DeathCaptures),
}

/// Remove `[slot/id]` suffixes left in the victim and killer names
pub fn strip_ids(c: &mut DeathCaptures) {
    c.victim = IDS.replace_all(&c.victim, "").into_owned();
    c.killer = IDS.replace_all(&c.killer, "").into_owned();
}

fn strip_parenthetical(text: &str) -> String {
    match PARENTHETICAL.captures(text).and_then(|caps| caps.get(1)) {
        Some(m) => format!("{}{}", &text[..m.start()], &text[m.end()..]),
        None => text.to_string(),
    }
}

/// `boar (Boar)` becomes `boar` when the killer is not a player
pub fn strip_killer_parenthetical(c: &mut DeathCaptures) {
    if !c.killer.is_empty() && c.killer_id.is_empty() && !c.reason.is_empty() {
        c.killer = strip_parenthetical(&c.killer);
    }
}

pub fn strip_reason_parenthetical(c: &mut DeathCaptures) {
    if !c.reason.is_empty() {
        c.reason = strip_parenthetical(&c.reason);
    }
}

/// Lower-case the reason and drop any remaining parentheses
pub fn normalize_reason(c: &mut DeathCaptures) {
    c.reason = c.reason.to_lowercase().replace(['(', ')'], "");
}

/// NPCs are printed with their id as their name
pub fn is_npc_on_npc(c: &DeathCaptures) -> bool {
    !c.victim.is_empty() && !c.victim_id.is_empty() && c.victim == c.victim_id
}

pub fn rename_npc_killer(c: &mut DeathCaptures) {
    if !c.killer.is_empty() && !c.killer_id.is_empty() && c.killer == c.killer_id {
        c.killer = NPC_KILLER.to_string();
    }
}

/// `tuna was killed by drowned`
pub fn normalize_drowning(c: &mut DeathCaptures) {
    if !c.killer.is_empty()
        && c.killer_id.is_empty()
        && !c.reason.is_empty()
        && c.reason.contains("drowned")
    {
        c.reason = "drowning".to_string();
    }
}

/// Turn normalized captures into an event: PvP when both sides are players,
/// otherwise a reason-based death
pub fn resolve(c: &DeathCaptures) -> Option<DeathEvent> {
    let how = DeathVerb::parse(&c.how)?;
    let present = |s: &str| !s.is_empty();

    if present(&c.victim) && present(&c.victim_id) {
        if present(&c.killer) && present(&c.killer_id) && !present(&c.reason) {
            return Some(DeathEvent {
                victim_name: c.victim.clone(),
                victim_id: Some(c.victim_id.clone()),
                how,
                killer_name: Some(c.killer.clone()),
                killer_id: Some(c.killer_id.clone()),
                reason: None,
                is_pvp: true,
            });
        }
        if present(&c.reason) {
            return Some(DeathEvent {
                victim_name: c.victim.clone(),
                victim_id: Some(c.victim_id.clone()),
                how,
                killer_name: None,
                killer_id: None,
                reason: Some(c.reason.clone()),
                is_pvp: false,
            });
        }
    }

    None
}

/// Run the full normalization pipeline over a log line
pub fn parse_death(line: &str) -> Option<DeathOutcome> {
    let mut c = DeathCaptures::capture(line)?;

    strip_ids(&mut c);
    strip_killer_parenthetical(&mut c);
    strip_reason_parenthetical(&mut c);
    normalize_reason(&mut c);
    if is_npc_on_npc(&c) {
        return Some(DeathOutcome::NpcDeath);
    }
    rename_npc_killer(&mut c);
    normalize_drowning(&mut c);

    Some(match resolve(&c) {
        Some(event) => DeathOutcome::Event(event),
        None => DeathOutcome::Unresolved(c),
    })
}

/// Death branch of the line cascade
pub fn match_death(line: &str) -> Option<Vec<DomainEvent>> {
    let events = match parse_death(line)? {
        DeathOutcome::Event(event) => vec![DomainEvent::Death(event)],
        DeathOutcome::NpcDeath => {
            debug!(line, "Skipping NPC death");
            Vec::new()
        }
        DeathOutcome::Unresolved(captures) => {
            warn!(line, ?captures, "Could not parse death message");
            Vec::new()
        }
    };
    Some(events)
}
