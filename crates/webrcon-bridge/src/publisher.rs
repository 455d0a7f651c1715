//! Publishing chat-facing events with kill-feed filtering and routing

use std::sync::Arc;
use tracing::trace;
use webrcon_bus::EventBus;
use webrcon_core::{BridgeEvent, EventKind};

use crate::SERVER_EVENTS;
use crate::config::{ChannelRoutes, KillFeed};

/// Publishes [`BridgeEvent`]s on the server-events topic
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<EventBus<BridgeEvent>>,
    kill_feed: KillFeed,
    routes: ChannelRoutes,
}

impl EventPublisher {
    pub fn new(bus: Arc<EventBus<BridgeEvent>>, kill_feed: KillFeed, routes: ChannelRoutes) -> Self {
        Self {
            bus,
            kill_feed,
            routes,
        }
    }

    /// Filter, route and publish an event. Returns the number of sinks
    /// it was queued for.
    pub fn publish(&self, event: BridgeEvent) -> usize {
        if !self.kill_feed.allows(event.kind) {
            trace!(kind = ?event.kind, "Kill feed disabled for event kind");
            return 0;
        }
        let channel = self.routes.channel_for(event.kind);
        self.bus.publish(SERVER_EVENTS, event.with_channel(channel))
    }

    /// Lifecycle notice without an actor
    pub fn notice(&self, kind: EventKind, text: &str) -> usize {
        self.publish(BridgeEvent::notice(kind, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filters_and_routes() {
        let bus = Arc::new(EventBus::<BridgeEvent>::new());
        let (_id, mut rx) = bus.subscribe_channel(SERVER_EVENTS);
        let publisher = EventPublisher::new(
            bus.clone(),
            KillFeed {
                pvp: true,
                other: false,
            },
            ChannelRoutes {
                chat: Some("chat".into()),
                killfeed: Some("kills".into()),
                ..Default::default()
            },
        );

        assert_eq!(publisher.publish(BridgeEvent::new(EventKind::Death, "", "x died from fall")), 0);
        assert_eq!(publisher.publish(BridgeEvent::new(EventKind::Kill, "", "a was killed by b")), 1);
        publisher.notice(EventKind::ServerConnected, "Connected to the server");

        let kill = rx.recv().await.unwrap();
        assert_eq!(kill.kind, EventKind::Kill);
        assert_eq!(kill.channel.as_deref(), Some("kills"));

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.kind, EventKind::ServerConnected);
        assert_eq!(notice.channel.as_deref(), Some("chat"));
        assert!(rx.try_recv().is_err());
    }
}
