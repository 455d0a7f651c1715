//! Inbound frame handling: classify, update shared state, publish

use tracing::{trace, warn};
use webrcon_core::DomainEvent;

use crate::classifier;
use crate::publisher::EventPublisher;
use crate::snapshot::StatusBoard;
use crate::stats::StatRecorder;

/// Applies classified events to the bridge
pub struct FrameHandler {
    publisher: EventPublisher,
    board: StatusBoard,
    stats: StatRecorder,
}

impl FrameHandler {
    pub fn new(publisher: EventPublisher, board: StatusBoard, stats: StatRecorder) -> Self {
        Self {
            publisher,
            board,
            stats,
        }
    }

    /// Handle one raw text frame. Returns the number of events it produced.
    pub async fn handle(&self, raw: &str) -> usize {
        let events = classifier::classify(raw);
        let produced = events.len();
        for event in events {
            self.dispatch(event).await;
        }
        produced
    }

    async fn dispatch(&self, event: DomainEvent) {
        if let DomainEvent::Status(snapshot) = &event {
            let version = self.board.replace(snapshot.clone());
            trace!(version, "Status snapshot replaced");
        }

        let kill = match &event {
            DomainEvent::Death(death) if death.is_pvp => {
                death.killer_id.clone().zip(death.victim_id.clone())
            }
            _ => None,
        };

        // Events go out before the stat update
        match event.to_bridge_event() {
            Ok(bridge_event) => {
                self.publisher.publish(bridge_event);
            }
            Err(e) => warn!(error = %e, "Failed to render event"),
        }

        if let Some((killer_id, victim_id)) = kill {
            self.stats.record_kill(&killer_id, &victim_id).await;
        }
    }
}
