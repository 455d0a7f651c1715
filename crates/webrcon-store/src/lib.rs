//! # webrcon-store
//!
//! Document store collaborator used for persisted per-player counters.
//!
//! Collections hold JSON documents addressed by numeric id. The bridge only
//! relies on `get`, exact-match `query` and merging `set`.

mod document;
mod error;
mod file;
mod memory;

pub use document::{Document, DocumentId, Query};
pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Document store interface
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// Documents matching `query`, ordered by id
    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError>;

    /// Insert (`id == None` or unknown id) or merge into an existing document.
    /// Returns the document id.
    async fn set(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        document: Document,
    ) -> Result<DocumentId, StoreError>;
}
