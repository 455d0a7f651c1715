//! Topic → subscriber registry

use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identifier handed out on subscribe
pub type SubscriptionId = u64;

/// One registered sink: its ordered queue and, for callback sinks, the
/// worker draining that queue
pub(crate) struct SinkEntry<E> {
    pub id: SubscriptionId,
    pub queue: mpsc::Sender<E>,
    pub worker: Option<JoinHandle<()>>,
}

/// Registry of sinks per topic
pub(crate) struct SinkRegistry<E> {
    topics: HashMap<String, Vec<SinkEntry<E>>>,
}

impl<E> SinkRegistry<E> {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    /// Register a sink under a topic
    pub fn insert(&mut self, topic: &str, entry: SinkEntry<E>) {
        self.topics.entry(topic.to_string()).or_default().push(entry);
    }

    /// Remove a sink. Returns the entry if it was registered.
    pub fn remove(&mut self, topic: &str, id: SubscriptionId) -> Option<SinkEntry<E>> {
        let entries = self.topics.get_mut(topic)?;
        let index = entries.iter().position(|entry| entry.id == id)?;
        let entry = entries.remove(index);
        if entries.is_empty() {
            self.topics.remove(topic);
        }
        Some(entry)
    }

    /// Queues of all sinks registered under a topic
    pub fn queues(&self, topic: &str) -> Vec<(SubscriptionId, mpsc::Sender<E>)> {
        self.topics
            .get(topic)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.id, entry.queue.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of sinks under a topic
    pub fn count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Remove every sink
    pub fn drain(&mut self) -> Vec<SinkEntry<E>> {
        self.topics.drain().flat_map(|(_, entries)| entries).collect()
    }
}
