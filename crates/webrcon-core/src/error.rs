//! Error types for the WebRCON bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, WebrconError>;

/// WebRCON bridge error types
#[derive(Debug, Error)]
pub enum WebrconError {
    /// Connect failure, send failure or lost connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// Frame did not follow the expected wire format
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persistence failure in the stat store
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No transport attached
    #[error("Not connected to the server")]
    NotConnected,

    /// `close()` was already called
    #[error("Shutdown already in progress")]
    ShutdownInProgress,
}

impl From<serde_json::Error> for WebrconError {
    fn from(err: serde_json::Error) -> Self {
        WebrconError::Serialization(err.to_string())
    }
}
