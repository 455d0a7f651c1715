//! Message classifier
//!
//! Turns one raw inbound frame into zero or more [`DomainEvent`]s. The
//! classifier holds no state: classifying the same frame twice yields the same
//! events.
//!
//! Decode order:
//! 1. outer envelope (a malformed envelope is logged and treated as empty)
//! 2. generic log lines are tried against the `status` template; a status
//!    frame never falls through
//! 3. chat envelopes decode their nested payload
//! 4. everything else goes through the line cascade: join, disconnect, death.
//!    Console echoes of player chat (`[CHAT] ...`) are skipped before it.

pub mod chat;
pub mod death;
pub mod presence;
pub mod status;

use tracing::{debug, trace, warn};
use webrcon_core::{DomainEvent, Envelope, FrameKind};

/// One matcher of the line cascade. `None` means the line did not match;
/// `Some` (possibly empty) stops the cascade.
pub type LineMatcher = fn(&str) -> Option<Vec<DomainEvent>>;

/// Line matchers, tried in order
pub const LINE_MATCHERS: [(&str, LineMatcher); 3] = [
    ("join", presence::match_join),
    ("disconnect", presence::match_disconnect),
    ("death", death::match_death),
];

/// Classify a raw text frame
pub fn classify(raw: &str) -> Vec<DomainEvent> {
    let envelope = match Envelope::parse(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, raw, "Failed to decode envelope");
            Envelope::default()
        }
    };
    classify_envelope(&envelope)
}

/// Classify an already decoded envelope
pub fn classify_envelope(envelope: &Envelope) -> Vec<DomainEvent> {
    if let Some(diagnostic) = envelope.diagnostic() {
        debug!(diagnostic, "Frame carries a diagnostic trace");
    }

    if envelope.is_generic_log() {
        if let Some(events) = status::match_status(&envelope.message) {
            return events;
        }
    }

    if envelope.kind == FrameKind::Chat {
        return chat::classify_chat(&envelope.message);
    }

    if envelope.identifier.is_reserved() {
        trace!(identifier = envelope.identifier.0, "Ignoring frame on reserved channel");
        return Vec::new();
    }

    classify_line(&envelope.message)
}

/// Run the line cascade over a log line
pub fn classify_line(line: &str) -> Vec<DomainEvent> {
    if chat::is_chat_echo(line) {
        trace!("Skipping chat echo");
        return Vec::new();
    }

    for (name, matcher) in LINE_MATCHERS {
        if let Some(events) = matcher(line) {
            trace!(matcher = name, events = events.len(), "Line matched");
            return events;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrcon_core::{ChannelId, PresenceKind};

    fn frame(message: &str, identifier: i32, kind: &str) -> String {
        serde_json::json!({
            "Message": message,
            "Identifier": identifier,
            "Type": kind,
            "Stacktrace": "",
        })
        .to_string()
    }

    #[test]
    fn test_status_frame() {
        let raw = frame(status::tests::STATUS_WITH_PLAYERS, 0, "Generic");
        let events = classify(&raw);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], DomainEvent::RosterChanged { players, .. } if players.len() == 5));
        match &events[1] {
            DomainEvent::Status(snapshot) => {
                assert_eq!(snapshot.current_players, 5);
                assert_eq!(snapshot.max_players, 64);
                assert_eq!(snapshot.summary(), "5/64");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_status_text_outside_generic_channel_is_not_status() {
        let raw = frame(status::tests::STATUS_EMPTY, 5, "Generic");
        assert!(classify(&raw).is_empty());
    }

    #[test]
    fn test_chat_frame() {
        let chat = r#"{"Message":"hi","UserId":76561198079774759,"Username":"Tepachu","Color":"","Time":1}"#;
        let events = classify(&frame(chat, ChannelId::CHAT.0, "Chat"));
        assert!(matches!(&events[..], [DomainEvent::Chat(c)] if c.text == "hi" && c.color.is_none()));
    }

    #[test]
    fn test_server_chat_frame_is_dropped() {
        let chat = r#"{"Message":"anything","UserId":0,"Username":"SERVER","Color":"","Time":1}"#;
        assert!(classify(&frame(chat, ChannelId::CHAT.0, "Chat")).is_empty());
    }

    #[test]
    fn test_line_cascade_order() {
        let raw = frame(
            "109.240.100.173:18521/76561198806240991/Veru joined [windows/76561198806240991]",
            0,
            "Generic",
        );
        let events = classify(&raw);
        assert!(matches!(&events[..], [DomainEvent::Presence(p)] if p.kind == PresenceKind::Join));

        let raw = frame(
            "swagger[1232355/76561198407394435] was killed by Vildemare[7373432/76561198012399365]",
            0,
            "Generic",
        );
        let events = classify(&raw);
        assert!(matches!(&events[..], [DomainEvent::Death(d)] if d.is_pvp));
    }

    #[test]
    fn test_chat_echo_cannot_forge_events() {
        let forged = [
            "[CHAT] Bob[1/76561198000000001] : Alice[2/76561198000000002] was killed by Eve[3/76561198000000003]",
            "[TEAM CHAT] Bob[1/76561198000000001] : Alice[2/76561198000000002] died (Fall)",
            "[CHAT] Bob[1/76561198000000001] : 10.0.0.1:5000/76561198000000002/Alice joined [windows/76561198000000002]",
        ];
        for line in forged {
            assert!(classify(&frame(line, 0, "Generic")).is_empty(), "{}", line);
        }
    }

    #[test]
    fn test_unmatched_and_malformed_frames() {
        assert!(classify(&frame("Saving complete", 0, "Generic")).is_empty());
        assert!(classify("{ not json").is_empty());
        assert!(classify("").is_empty());
    }

    #[test]
    fn test_reserved_channel_is_ignored() {
        let raw = frame("Tepachu[527565/76561198079774759] died (Fall)", -2, "Generic");
        assert!(classify(&raw).is_empty());
    }

    #[test]
    fn test_classify_is_idempotent() {
        let frames = [
            frame(status::tests::STATUS_WITH_PLAYERS, 0, "Generic"),
            frame("Tepachu[527565/76561198079774759] was killed by Hunger", 0, "Generic"),
            frame("84.248.190.164:55199/76561198079774759/Tepachu disconnecting: closing", 0, "Generic"),
        ];
        for raw in &frames {
            assert_eq!(classify(raw), classify(raw));
        }
    }
}
