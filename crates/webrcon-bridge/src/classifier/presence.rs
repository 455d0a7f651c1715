//! Join and disconnect log lines

use regex::{Captures, Regex};
use std::sync::LazyLock;
use webrcon_core::{DomainEvent, PresenceEvent, PresenceKind};

static JOIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ip>.*):(?P<port>[0-9]+)/(?P<user_id>[0-9]+)/(?P<username>.+?) joined \[(?P<os>.*)/[0-9]+\]")
        .expect("valid regex")
});

static DISCONNECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ip>.*):(?P<port>[0-9]+)/(?P<user_id>[0-9]+)/(?P<username>.+?) disconnecting: (?P<reason>.*)")
        .expect("valid regex")
});

fn group(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name).map_or_else(String::new, |m| m.as_str().to_string())
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn presence(caps: &Captures<'_>, kind: PresenceKind, os: Option<String>, detail: Option<String>) -> PresenceEvent {
    PresenceEvent {
        ip: group(caps, "ip"),
        port: group(caps, "port"),
        user_id: group(caps, "user_id").parse().unwrap_or_default(),
        username: group(caps, "username"),
        os,
        detail,
        kind,
    }
}

/// `{ip}:{port}/{id}/{name} joined [{os}/{id}]`
pub fn match_join(message: &str) -> Option<Vec<DomainEvent>> {
    let caps = JOIN.captures(message)?;
    let os = non_empty(group(&caps, "os"));
    Some(vec![DomainEvent::Presence(presence(
        &caps,
        PresenceKind::Join,
        os,
        None,
    ))])
}

/// `{ip}:{port}/{id}/{name} disconnecting: {reason}`
pub fn match_disconnect(message: &str) -> Option<Vec<DomainEvent>> {
    let caps = DISCONNECT.captures(message)?;
    let reason = non_empty(group(&caps, "reason"));
    Some(vec![DomainEvent::Presence(presence(
        &caps,
        PresenceKind::Leave,
        None,
        reason,
    ))])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_presence(events: Option<Vec<DomainEvent>>) -> PresenceEvent {
        match events.as_deref() {
            Some([DomainEvent::Presence(presence)]) => presence.clone(),
            other => panic!("expected one presence event, got {:?}", other),
        }
    }

    #[test]
    fn test_join_line() {
        let presence = only_presence(match_join(
            "109.240.100.173:18521/76561198806240991/Veru joined [windows/76561198806240991]",
        ));
        assert_eq!(presence.kind, PresenceKind::Join);
        assert_eq!(presence.ip, "109.240.100.173");
        assert_eq!(presence.port, "18521");
        assert_eq!(presence.user_id, 76561198806240991);
        assert_eq!(presence.username, "Veru");
        assert_eq!(presence.os.as_deref(), Some("windows"));
    }

    #[test]
    fn test_join_without_os() {
        let presence = only_presence(match_join(
            "10.0.0.1:5000/76561198806240991/Some Player joined [/76561198806240991]",
        ));
        assert_eq!(presence.username, "Some Player");
        assert_eq!(presence.os, None);
    }

    #[test]
    fn test_disconnect_line() {
        let presence = only_presence(match_disconnect(
            "84.248.190.164:55199/76561198079774759/Tepachu disconnecting: closing",
        ));
        assert_eq!(presence.kind, PresenceKind::Leave);
        assert_eq!(presence.username, "Tepachu");
        assert_eq!(presence.user_id, 76561198079774759);
        assert_eq!(presence.detail.as_deref(), Some("closing"));
    }

    #[test]
    fn test_unrelated_lines() {
        assert!(match_join("Saving complete").is_none());
        assert!(match_disconnect("Tepachu[1/2] died (Fall)").is_none());
    }
}
