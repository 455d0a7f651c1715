//! Store error types

use std::path::PathBuf;
use thiserror::Error;
use webrcon_core::WebrconError;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt collection file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for WebrconError {
    fn from(err: StoreError) -> Self {
        WebrconError::Store(err.to_string())
    }
}
