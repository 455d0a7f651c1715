//! WebRCON wire envelope
//!
//! Every frame exchanged with the game server is a JSON object of the shape
//! `{"Message": ..., "Identifier": ..., "Type": ..., "Stacktrace": ...}`.
//! Chat frames carry a second JSON document inside `Message`.

use serde::{Deserialize, Serialize};

/// Channel identifier carried in the `Identifier` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub i32);

impl ChannelId {
    /// Generic log line
    pub const GENERIC: ChannelId = ChannelId(0);
    /// Structured chat
    pub const CHAT: ChannelId = ChannelId(-1);
    /// Frames the server marks as ignorable
    pub const IGNORE: ChannelId = ChannelId(-2);

    /// Negative identifiers other than chat are reserved by the server
    pub fn is_reserved(self) -> bool {
        self.0 < 0 && self != Self::CHAT
    }
}

/// The `Type` tag of an envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum FrameKind {
    Generic,
    Chat,
    Ignore,
    /// Empty or unrecognised tag (outbound commands are sent with `""`)
    #[default]
    Unspecified,
}

impl FrameKind {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Generic => "Generic",
            FrameKind::Chat => "Chat",
            FrameKind::Ignore => "Ignore",
            FrameKind::Unspecified => "",
        }
    }
}

impl From<String> for FrameKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "Generic" => FrameKind::Generic,
            "Chat" => FrameKind::Chat,
            "Ignore" => FrameKind::Ignore,
            _ => FrameKind::Unspecified,
        }
    }
}

impl From<FrameKind> for &'static str {
    fn from(kind: FrameKind) -> Self {
        kind.as_str()
    }
}

/// Outer record wrapping every frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    /// Log line, command text, or nested chat JSON
    #[serde(default)]
    pub message: String,
    /// Channel identifier
    #[serde(default)]
    pub identifier: ChannelId,
    /// Kind tag
    #[serde(default, rename = "Type")]
    pub kind: FrameKind,
    /// Diagnostic trace attached by the server
    #[serde(default, alias = "StackTrace")]
    pub stacktrace: String,
}

impl Envelope {
    /// Parse an inbound text frame
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Console command frame sent to the server
    pub fn command(message: impl Into<String>, kind: FrameKind) -> Self {
        Self {
            message: message.into(),
            identifier: ChannelId::GENERIC,
            kind,
            stacktrace: String::new(),
        }
    }

    /// The `status` request sent by the poller
    pub fn status_request() -> Self {
        Self::command("status", FrameKind::Generic)
    }

    /// A `say` command broadcasting `text` to in-game chat
    pub fn say(text: &str) -> Self {
        Self::command(format!("say {}", text), FrameKind::Unspecified)
    }

    /// Serialize to the wire text
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Whether this is a generic log line on the generic channel
    pub fn is_generic_log(&self) -> bool {
        self.identifier == ChannelId::GENERIC && self.kind == FrameKind::Generic
    }

    /// Diagnostic trace, if the server attached one
    pub fn diagnostic(&self) -> Option<&str> {
        (!self.stacktrace.is_empty()).then_some(self.stacktrace.as_str())
    }
}

/// Nested chat record carried in the `Message` of a chat envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChatPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "UserId")]
    pub user_id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub time: u64,
}

impl ChatPayload {
    /// Second-level decode of a chat envelope's message
    pub fn parse(message: &str) -> serde_json::Result<Self> {
        serde_json::from_str(message)
    }
}
