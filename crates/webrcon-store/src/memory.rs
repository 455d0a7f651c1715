//! In-memory document store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::DocumentStore;
use crate::document::{Collection, Document, DocumentId, Query, validate_collection};
use crate::error::StoreError;

/// Document store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| c.get(id)))
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError> {
        validate_collection(collection)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.query(query))
            .unwrap_or_default())
    }

    async fn set(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        document: Document,
    ) -> Result<DocumentId, StoreError> {
        validate_collection(collection)?;
        let mut collections = self.collections.write().await;
        Ok(collections
            .entry(collection.to_string())
            .or_default()
            .set(id, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_query_set() {
        let store = MemoryStore::new();
        assert!(store.get("users", 1).await.unwrap().is_none());
        assert!(store.query("users", &Query::eq("SteamID", "1")).await.unwrap().is_empty());

        let id = store
            .set("users", None, doc(json!({"SteamID": "1", "Kills": 0})))
            .await
            .unwrap();
        let stored = store.get("users", id).await.unwrap().unwrap();
        assert_eq!(stored["Kills"], 0);

        let matches = store.query("users", &Query::eq("SteamID", "1")).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, id);
    }

    #[tokio::test]
    async fn test_rejects_invalid_collection() {
        let store = MemoryStore::new();
        let err = store.set("a/b", None, Document::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(_)));
    }
}
