//! JSON-file backed document store
//!
//! Each collection lives in `{dir}/{collection}.json` and is loaded on first
//! access. Every `set` rewrites the collection file through a temporary file
//! and a rename, so a crash never leaves a half-written collection behind.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::DocumentStore;
use crate::document::{Collection, Document, DocumentId, Query, validate_collection};
use crate::error::StoreError;

/// Document store persisted as one JSON file per collection
pub struct JsonFileStore {
    dir: PathBuf,
    collections: Mutex<HashMap<String, Collection>>,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        info!("Opened document store at {}", dir.display());

        Ok(Self {
            dir,
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    async fn load(&self, collection: &str) -> Result<Collection, StoreError> {
        let path = self.collection_path(collection);
        match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Ok(Collection::default()),
            Ok(content) => {
                let loaded: Collection = serde_json::from_str(&content)
                    .map_err(|source| StoreError::Corrupt { path, source })?;
                debug!(collection, documents = loaded.len(), "Loaded collection");
                Ok(loaded)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collection::default()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn persist(&self, collection: &str, contents: &Collection) -> Result<(), StoreError> {
        let path = self.collection_path(collection);
        let tmp = self.dir.join(format!(".{}.json.tmp", collection));
        let json = serde_json::to_vec_pretty(contents)?;

        fs::write(&tmp, json).await.map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    /// Run `f` against a loaded collection while holding the store lock
    async fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection) -> T,
    ) -> Result<T, StoreError> {
        validate_collection(collection)?;
        let mut collections = self.collections.lock().await;
        if !collections.contains_key(collection) {
            let loaded = self.load(collection).await?;
            collections.insert(collection.to_string(), loaded);
        }
        let entry = collections.entry(collection.to_string()).or_default();
        Ok(f(entry))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.with_collection(collection, |c| c.get(id)).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError> {
        self.with_collection(collection, |c| c.query(query)).await
    }

    async fn set(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        document: Document,
    ) -> Result<DocumentId, StoreError> {
        validate_collection(collection)?;
        let mut collections = self.collections.lock().await;
        let mut updated = match collections.get(collection) {
            Some(existing) => existing.clone(),
            None => self.load(collection).await?,
        };
        let id = updated.set(id, document);

        // Only commit to the cache once the file write succeeded
        self.persist(collection, &updated).await?;
        collections.insert(collection.to_string(), updated);
        Ok(id)
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
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let id = store
            .set("users", None, doc(json!({"SteamID": "76561198012399365", "Kills": 3})))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        let stored = reopened.get("users", id).await.unwrap().unwrap();
        assert_eq!(stored["Kills"], 3);

        let next = reopened
            .set("users", None, doc(json!({"SteamID": "2"})))
            .await
            .unwrap();
        assert_ne!(next, id);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested")).await.unwrap();
        assert!(store.get("users", 1).await.unwrap().is_none());
        assert!(store.query("users", &Query::eq("SteamID", "1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("users.json"), "{ nope").unwrap();

        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let err = store.get("users", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
