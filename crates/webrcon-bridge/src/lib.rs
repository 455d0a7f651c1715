//! # webrcon-bridge
//!
//! Protocol bridge between a game server's WebRCON feed and a chat event
//! stream.
//!
//! ## Architecture
//!
//! ```text
//!   game server ──ws──▶ read loop ──▶ classifier ──▶ EventBus<BridgeEvent>
//!        ▲                                              ("webrcon.events")
//!        │
//!        └── write lock ◀── keepalive / status poller / outbound relay
//!                                              ▲
//!                       EventBus<OutgoingChat> ("chat.outgoing")
//! ```
//!
//! A lost connection is surfaced through [`Bridge::terminated`]; the bridge
//! never reconnects by itself.

pub mod bridge;
pub mod classifier;
pub mod config;
pub mod connection;
pub mod handler;
mod poller;
pub mod publisher;
pub mod relay;
pub mod snapshot;
pub mod stats;
pub mod transport;

pub use bridge::{Bridge, BridgeDeps};
pub use classifier::classify;
pub use config::{BridgeConfig, ChannelRoutes, ConnectionConfig, KillFeed};
pub use connection::ConnectionLost;
pub use snapshot::{StatusBoard, VersionedSnapshot};
pub use stats::StatRecorder;

/// Topic carrying [`webrcon_core::BridgeEvent`]s to the chat side
pub const SERVER_EVENTS: &str = "webrcon.events";

/// Topic carrying [`webrcon_core::OutgoingChat`] from the chat side
pub const OUTGOING_CHAT: &str = "chat.outgoing";
