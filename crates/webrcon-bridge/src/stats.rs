//! Persisted per-player kill and death counters

use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};
use webrcon_core::{Result, WebrconError};
use webrcon_store::{Document, DocumentStore, Query};

/// Collection holding one record per player
pub const USERS: &str = "users";
pub const STEAM_ID: &str = "SteamID";
pub const KILLS: &str = "Kills";
pub const DEATHS: &str = "Deaths";

/// Increments counters in the document store.
///
/// Every read-increment-write runs under one lock, so concurrent increments
/// for the same player never lose an update.
#[derive(Clone)]
pub struct StatRecorder {
    store: Arc<dyn DocumentStore>,
    lock: Arc<Mutex<()>>,
}

/// Stored counters may come back as floats; read them as integers
fn count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

impl StatRecorder {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn increment_kill_count(&self, steam_id: &str) -> Result<i64> {
        self.increment_field(KILLS, steam_id).await
    }

    pub async fn increment_death_count(&self, steam_id: &str) -> Result<i64> {
        self.increment_field(DEATHS, steam_id).await
    }

    /// Increment `field` of the record for `steam_id`, creating a zeroed
    /// record first if none exists. Returns the new value.
    pub async fn increment_field(&self, field: &str, steam_id: &str) -> Result<i64> {
        let _guard = self.lock.lock().await;
        self.increment_locked(field, steam_id).await
    }

    /// Count one PvP kill: the killer's kills and the victim's deaths.
    /// Failures are logged and otherwise ignored.
    pub async fn record_kill(&self, killer_id: &str, victim_id: &str) {
        let _guard = self.lock.lock().await;

        if let Err(e) = self.increment_locked(KILLS, killer_id).await {
            error!(killer_id, "Failed to increment kill count: {}", e);
        }
        if let Err(e) = self.increment_locked(DEATHS, victim_id).await {
            error!(victim_id, "Failed to increment death count: {}", e);
        }
    }

    async fn increment_locked(&self, field: &str, steam_id: &str) -> Result<i64> {
        if field.is_empty() {
            return Err(WebrconError::Store("field is empty".into()));
        }
        if steam_id.is_empty() {
            return Err(WebrconError::Store("steam id is empty".into()));
        }

        let matches = self.store.query(USERS, &Query::eq(STEAM_ID, steam_id)).await?;
        let (id, mut record) = match matches.into_iter().next() {
            Some((id, record)) => (Some(id), record),
            None => (None, zeroed(steam_id)),
        };

        let value = count(record.get(field)) + 1;
        record.insert(field.to_string(), json!(value));
        for counter in [KILLS, DEATHS] {
            let coerced = count(record.get(counter));
            record.insert(counter.to_string(), json!(coerced));
        }

        let id = self.store.set(USERS, id, record).await?;
        debug!(steam_id, field, value, id, "Incremented stat counter");
        Ok(value)
    }

    /// Current counters for a player, `(kills, deaths)`
    pub async fn counts(&self, steam_id: &str) -> Result<Option<(i64, i64)>> {
        let matches = self.store.query(USERS, &Query::eq(STEAM_ID, steam_id)).await?;
        Ok(matches
            .into_iter()
            .next()
            .map(|(_, record)| (count(record.get(KILLS)), count(record.get(DEATHS)))))
    }
}

fn zeroed(steam_id: &str) -> Document {
    let mut record = Document::new();
    record.insert(STEAM_ID.to_string(), json!(steam_id));
    record.insert(KILLS.to_string(), json!(0));
    record.insert(DEATHS.to_string(), json!(0));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrcon_store::{MemoryStore, StoreError};

    fn recorder() -> (StatRecorder, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (StatRecorder::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_creates_record_on_first_increment() {
        let (stats, _) = recorder();
        assert_eq!(stats.counts("76561198012399365").await.unwrap(), None);

        assert_eq!(stats.increment_kill_count("76561198012399365").await.unwrap(), 1);
        assert_eq!(stats.increment_kill_count("76561198012399365").await.unwrap(), 2);
        assert_eq!(stats.increment_death_count("76561198012399365").await.unwrap(), 1);
        assert_eq!(stats.counts("76561198012399365").await.unwrap(), Some((2, 1)));
    }

    #[tokio::test]
    async fn test_float_counters_are_coerced() {
        let (stats, store) = recorder();
        let mut record = Document::new();
        record.insert(STEAM_ID.into(), json!("1"));
        record.insert(KILLS.into(), json!(4.0));
        record.insert(DEATHS.into(), json!(2.0));
        let id = store.set(USERS, None, record).await.unwrap();

        assert_eq!(stats.increment_kill_count("1").await.unwrap(), 5);
        let stored = store.get(USERS, id).await.unwrap().unwrap();
        assert_eq!(stored[KILLS], json!(5));
        assert_eq!(stored[DEATHS], json!(2));
        assert!(stored[DEATHS].is_i64());
    }

    #[tokio::test]
    async fn test_record_kill_updates_both_players() {
        let (stats, _) = recorder();
        stats.record_kill("killer", "victim").await;
        assert_eq!(stats.counts("killer").await.unwrap(), Some((1, 0)));
        assert_eq!(stats.counts("victim").await.unwrap(), Some((0, 1)));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let (stats, _) = recorder();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                stats.increment_kill_count("76561198012399365").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(stats.counts("76561198012399365").await.unwrap(), Some((50, 0)));
    }

    #[tokio::test]
    async fn test_rejects_empty_ids() {
        let (stats, _) = recorder();
        assert!(stats.increment_kill_count("").await.is_err());
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl DocumentStore for FailingStore {
        async fn get(&self, _: &str, _: u64) -> std::result::Result<Option<Document>, StoreError> {
            Err(StoreError::InvalidCollection("offline".into()))
        }

        async fn query(
            &self,
            _: &str,
            _: &Query,
        ) -> std::result::Result<Vec<(u64, Document)>, StoreError> {
            Err(StoreError::InvalidCollection("offline".into()))
        }

        async fn set(
            &self,
            _: &str,
            _: Option<u64>,
            _: Document,
        ) -> std::result::Result<u64, StoreError> {
            Err(StoreError::InvalidCollection("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_panicking() {
        let stats = StatRecorder::new(Arc::new(FailingStore));
        let err = stats.increment_kill_count("1").await.unwrap_err();
        assert!(matches!(err, WebrconError::Store(_)));
        stats.record_kill("1", "2").await;
    }
}
