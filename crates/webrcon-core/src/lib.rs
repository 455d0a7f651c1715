//! # webrcon-core
//!
//! Core types for the WebRCON chat bridge.
//!
//! This crate provides the foundational types shared by the bridge crates:
//! - The wire envelope and nested chat payload
//! - Domain events produced by the classifier
//! - The chat-facing event stream shape
//! - Server status snapshot and roster

pub mod envelope;
pub mod error;
pub mod event;
pub mod status;

pub use envelope::{ChannelId, ChatPayload, Envelope, FrameKind};
pub use error::{Result, WebrconError};
pub use event::{
    BridgeEvent, ChatEvent, DeathEvent, DeathVerb, DomainEvent, EventKind, OutgoingChat,
    PresenceEvent, PresenceKind,
};
pub use status::{PlayerInfo, StatusSnapshot};
