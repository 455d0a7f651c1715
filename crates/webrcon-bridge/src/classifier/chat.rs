//! Structured chat frames

use tracing::{trace, warn};
use webrcon_core::{ChatEvent, ChatPayload, DomainEvent};

/// Speaker name the server uses for its own broadcasts
pub const SYSTEM_SPEAKER: &str = "SERVER";

/// Prefixes of the console echo of player chat on the generic log channel
pub const CHAT_ECHO_PREFIXES: [&str; 2] = ["[CHAT] ", "[TEAM CHAT] "];

/// Whether a log line is a console echo of player chat. The rest of such a
/// line is typed by a player and must not be read as a server log line.
pub fn is_chat_echo(line: &str) -> bool {
    CHAT_ECHO_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Decode the nested chat payload of a chat envelope
pub fn classify_chat(message: &str) -> Vec<DomainEvent> {
    let payload = match ChatPayload::parse(message) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, raw = message, "Failed to decode chat payload");
            return Vec::new();
        }
    };

    if payload.username == SYSTEM_SPEAKER {
        trace!("Ignoring chat from {}", SYSTEM_SPEAKER);
        return Vec::new();
    }

    let color = (!payload.color.is_empty()).then_some(payload.color);
    vec![DomainEvent::Chat(ChatEvent {
        username: payload.username,
        user_id: payload.user_id,
        text: payload.message,
        color,
        timestamp: payload.time,
    })]
}
