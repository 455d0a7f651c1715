//! In-process event bus
//!
//! Every sink owns a bounded ordered queue. `publish` only enqueues, so a
//! slow or blocked sink never stalls the publisher or its sibling sinks, and
//! each sink observes events in publish order. When a sink's queue is full
//! the event is dropped for that sink and logged; the sink stays subscribed.

use crate::registry::{SinkEntry, SinkRegistry, SubscriptionId};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

/// Per-sink queue capacity used by [`EventBus::new`]
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Receiver of events published on a topic
#[async_trait]
pub trait EventSink<E>: Send + Sync + 'static {
    /// Handle one event. Called sequentially, in publish order.
    async fn deliver(&self, event: E);
}

/// Adapter turning an async closure into an [`EventSink`]
pub struct FnSink<F>(pub F);

#[async_trait]
impl<E, F, Fut> EventSink<E> for FnSink<F>
where
    E: Send + 'static,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn deliver(&self, event: E) {
        (self.0)(event).await
    }
}

/// Named-topic publish/subscribe bus
pub struct EventBus<E> {
    registry: RwLock<SinkRegistry<E>>,
    capacity: usize,
    next_id: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl<E> EventBus<E>
where
    E: Clone + Send + 'static,
{
    /// Create an empty bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an empty bus whose sinks each queue at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: RwLock::new(SinkRegistry::new()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a callback sink. A dedicated worker task drains the sink's
    /// queue, so this must be called from within a tokio runtime.
    pub fn subscribe(&self, topic: &str, sink: Arc<dyn EventSink<E>>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (queue, mut rx) = mpsc::channel::<E>(self.capacity);

        let worker_topic = topic.to_string();
        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.deliver(event).await;
            }
            trace!(topic = %worker_topic, id, "Sink worker stopped");
        });

        self.write().insert(
            topic,
            SinkEntry {
                id,
                queue,
                worker: Some(worker),
            },
        );
        debug!(topic, id, "Sink subscribed");
        id
    }

    /// Register a channel sink and return its receiving end
    pub fn subscribe_channel(&self, topic: &str) -> (SubscriptionId, mpsc::Receiver<E>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (queue, rx) = mpsc::channel(self.capacity);
        self.write().insert(
            topic,
            SinkEntry {
                id,
                queue,
                worker: None,
            },
        );
        debug!(topic, id, "Channel subscribed");
        (id, rx)
    }

    /// Remove a sink. Events already queued for it are still delivered; the
    /// worker stops once its queue is drained. Returns whether the sink was
    /// registered.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let removed = self.write().remove(topic, id);
        if removed.is_some() {
            debug!(topic, id, "Sink unsubscribed");
        }
        removed.is_some()
    }

    /// Enqueue an event for every sink of a topic. Never blocks. Returns the
    /// number of sinks the event was queued for; sinks with a full queue miss
    /// the event.
    pub fn publish(&self, topic: &str, event: E) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);

        let queues = self.read().queues(topic);
        if queues.is_empty() {
            trace!(topic, "Publish with no subscribers");
            return 0;
        }

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, queue) in queues {
            match queue.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(topic, id, capacity = self.capacity, "Sink queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        // Receivers of channel sinks may have been dropped without unsubscribing
        if !closed.is_empty() {
            let mut registry = self.write();
            for id in closed {
                registry.remove(topic, id);
                debug!(topic, id, "Pruned closed sink");
            }
        }

        delivered
    }

    /// Number of sinks registered under a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.read().count(topic)
    }

    /// Total number of publish calls
    pub fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Events dropped because a sink's queue was full
    pub fn events_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drop every sink. Workers finish delivering what is already queued.
    pub fn close(&self) {
        let entries = self.write().drain();
        debug!(sinks = entries.len(), "Event bus closed");
        for entry in entries {
            drop(entry.queue);
            drop(entry.worker);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SinkRegistry<E>> {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SinkRegistry<E>> {
        self.registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<E> Default for EventBus<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
