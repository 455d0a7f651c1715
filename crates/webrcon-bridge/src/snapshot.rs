//! Versioned status snapshot shared with any number of readers

use std::sync::Arc;
use tokio::sync::watch;
use webrcon_core::StatusSnapshot;

/// A snapshot together with its replacement counter
#[derive(Debug, Clone)]
pub struct VersionedSnapshot {
    pub version: u64,
    pub snapshot: Arc<StatusSnapshot>,
}

/// Holder of the latest status snapshot.
///
/// The snapshot is only ever replaced as a whole; readers get an `Arc` to an
/// immutable value. `None` means no status frame has been parsed yet.
#[derive(Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<Option<VersionedSnapshot>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the snapshot, returning its new version
    pub fn replace(&self, snapshot: StatusSnapshot) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|current| {
            version = current.as_ref().map_or(1, |v| v.version + 1);
            *current = Some(VersionedSnapshot {
                version,
                snapshot: Arc::new(snapshot),
            });
        });
        version
    }

    /// Latest snapshot, if any
    pub fn current(&self) -> Option<VersionedSnapshot> {
        self.tx.borrow().clone()
    }

    /// Watch for replacements
    pub fn subscribe(&self) -> watch::Receiver<Option<VersionedSnapshot>> {
        self.tx.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
