//! Bridge lifecycle: connect, run the background tasks, close

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};
use webrcon_bus::{EventBus, SubscriptionId};
use webrcon_core::{BridgeEvent, EventKind, OutgoingChat, Result, WebrconError};
use webrcon_store::DocumentStore;

use crate::OUTGOING_CHAT;
use crate::config::BridgeConfig;
use crate::connection::{
    self, CONNECT_FAILED_NOTICE, CONNECTED_NOTICE, Connection, ConnectionLost, GOING_AWAY_NOTICE,
};
use crate::handler::FrameHandler;
use crate::poller;
use crate::publisher::EventPublisher;
use crate::relay;
use crate::snapshot::StatusBoard;
use crate::stats::StatRecorder;
use crate::transport::{self, FrameReader, FrameWriter};

/// Collaborators the bridge is wired to
#[derive(Clone)]
pub struct BridgeDeps {
    /// Server events for the chat side
    pub events: Arc<EventBus<BridgeEvent>>,
    /// Chat-side messages to relay into the game
    pub outgoing: Arc<EventBus<OutgoingChat>>,
    /// Store for kill/death counters
    pub store: Arc<dyn DocumentStore>,
}

/// A running bridge between the WebRCON server and the chat side
pub struct Bridge {
    connection: Arc<Connection>,
    outgoing: Arc<EventBus<OutgoingChat>>,
    relay_subscription: SubscriptionId,
    board: StatusBoard,
    stats: StatRecorder,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Connect to the server over WebSocket and start the bridge
    pub async fn connect(config: BridgeConfig, deps: BridgeDeps) -> Result<Self> {
        let url = config.connection.url();
        info!(
            "Connecting to ws://{}:{}/<secret>",
            config.connection.host, config.connection.port
        );

        match transport::connect(&url, config.connection.write_timeout).await {
            Ok((writer, reader)) => Ok(Self::start(config, deps, writer, reader)),
            Err(e) => {
                error!("Could not connect to server: {}", e);
                let publisher = EventPublisher::new(deps.events, config.kill_feed, config.routes);
                publisher.notice(EventKind::ServerDisconnected, CONNECT_FAILED_NOTICE);
                sleep(config.connection.disconnect_grace).await;
                Err(e)
            }
        }
    }

    /// Start the bridge over an established transport
    pub fn start<W, R>(config: BridgeConfig, deps: BridgeDeps, writer: W, reader: R) -> Self
    where
        W: FrameWriter + 'static,
        R: FrameReader + 'static,
    {
        let publisher = EventPublisher::new(deps.events.clone(), config.kill_feed, config.routes.clone());
        let board = StatusBoard::new();
        let stats = StatRecorder::new(deps.store.clone());
        let poll_interval = config.poll_interval();

        let connection = Connection::new(Box::new(writer), config.connection, publisher.clone());
        info!("Connected to server");
        publisher.notice(EventKind::ServerConnected, CONNECTED_NOTICE);

        let handler = FrameHandler::new(publisher, board.clone(), stats.clone());
        let (relay_subscription, outgoing_rx) = deps.outgoing.subscribe_channel(OUTGOING_CHAT);

        let tasks = vec![
            tokio::spawn(connection::read_loop(connection.clone(), reader, handler)),
            tokio::spawn(connection::keepalive(connection.clone())),
            tokio::spawn(poller::run(connection.clone(), poll_interval)),
            tokio::spawn(relay::run(connection.clone(), outgoing_rx, config.relay_prefix)),
        ];

        Self {
            connection,
            outgoing: deps.outgoing,
            relay_subscription,
            board,
            stats,
            tasks: Mutex::new(tasks),
        }
    }

    /// Latest server status
    pub fn status(&self) -> &StatusBoard {
        &self.board
    }

    /// Kill/death counters
    pub fn stats(&self) -> &StatRecorder {
        &self.stats
    }

    /// Send a raw text frame to the server
    pub async fn send_frame(&self, text: String) -> Result<()> {
        self.connection.send_frame(text).await
    }

    /// Resolves once the connection is lost. Never resolves after a
    /// caller-initiated [`close`](Self::close).
    pub async fn terminated(&self) -> ConnectionLost {
        let mut lost = self.connection.subscribe_lost();
        let signal = lost
            .wait_for(Option::is_some)
            .await
            .map(|signal| signal.clone())
            .ok()
            .flatten();
        signal.unwrap_or_else(|| ConnectionLost::new("connection state dropped"))
    }

    /// Shut the bridge down. A second call fails with
    /// [`WebrconError::ShutdownInProgress`] and has no side effects.
    pub async fn close(&self) -> Result<()> {
        if !self.connection.begin_shutdown() {
            warn!("Already shutting down");
            return Err(WebrconError::ShutdownInProgress);
        }

        info!("Shutting down bridge");
        self.connection
            .publisher()
            .notice(EventKind::ServerDisconnected, GOING_AWAY_NOTICE);
        sleep(self.connection.config().disconnect_grace).await;

        self.outgoing.unsubscribe(OUTGOING_CHAT, self.relay_subscription);
        if let Err(e) = self.connection.close_transport().await {
            warn!("Failed to close transport cleanly: {}", e);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|p| p.into_inner()));
        for task in tasks {
            task.abort();
        }
        info!("Bridge closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SERVER_EVENTS;
    use crate::config::{ConnectionConfig, KillFeed};
    use crate::transport::Inbound;
    use crate::transport::fake::{self, Sent};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_test::{assert_pending, assert_ready};
    use webrcon_core::Envelope;
    use webrcon_store::MemoryStore;

    fn config() -> BridgeConfig {
        let connection = ConnectionConfig {
            disconnect_grace: Duration::from_millis(5),
            ..ConnectionConfig::new("localhost", 28016, "secret")
        };
        let mut config = BridgeConfig::new(connection);
        config.kill_feed = KillFeed {
            pvp: true,
            other: true,
        };
        config
    }

    fn deps() -> (BridgeDeps, mpsc::Receiver<BridgeEvent>) {
        let events = Arc::new(EventBus::<BridgeEvent>::new());
        let (_id, rx) = events.subscribe_channel(SERVER_EVENTS);
        let deps = BridgeDeps {
            events,
            outgoing: Arc::new(EventBus::new()),
            store: Arc::new(MemoryStore::new()),
        };
        (deps, rx)
    }

    async fn next_text(sent: &mut mpsc::UnboundedReceiver<Sent>) -> String {
        loop {
            match sent.recv().await {
                Some(Sent::Text(text)) => return text,
                Some(_) => continue,
                None => panic!("writer dropped"),
            }
        }
    }

    #[tokio::test]
    async fn test_start_announces_and_polls_status() {
        let (deps, mut events) = deps();
        let (writer, reader, mut sent, _frames) = fake::pair();
        let bridge = Bridge::start(config(), deps, writer, reader);

        let connected = events.recv().await.unwrap();
        assert_eq!(connected.kind, EventKind::ServerConnected);
        assert_eq!(connected.text, CONNECTED_NOTICE);

        // First poll fires immediately
        let request = Envelope::status_request().to_text().unwrap();
        assert_eq!(next_text(&mut sent).await, request);

        bridge.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_inbound_frames_reach_the_chat_side() {
        let (deps, mut events) = deps();
        let (writer, reader, _sent, frames) = fake::pair();
        let bridge = Bridge::start(config(), deps, writer, reader);
        events.recv().await.unwrap();

        let frame = serde_json::json!({
            "Message": "swagger[1232355/76561198407394435] was killed by Vildemare[7373432/76561198012399365]",
            "Identifier": 0,
            "Type": "Generic",
            "Stacktrace": "",
        });
        frames.send(Ok(Inbound::Text(frame.to_string()))).unwrap();

        let kill = events.recv().await.unwrap();
        assert_eq!(kill.kind, EventKind::Kill);
        assert_eq!(kill.text, "swagger was killed by Vildemare");

        bridge.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_outgoing_chat_is_relayed() {
        let (deps, _events) = deps();
        let outgoing = deps.outgoing.clone();
        let (writer, reader, mut sent, _frames) = fake::pair();
        let bridge = Bridge::start(config(), deps, writer, reader);

        // Skip the initial status request
        next_text(&mut sent).await;

        outgoing.publish(
            OUTGOING_CHAT,
            OutgoingChat {
                actor: "Dids".into(),
                text: "hello".into(),
            },
        );
        let say = next_text(&mut sent).await;
        assert_eq!(
            say,
            r#"{"Message":"say [DISCORD] Dids: hello","Identifier":0,"Type":"","Stacktrace":""}"#
        );

        bridge.close().await.unwrap();
        assert_eq!(outgoing.subscriber_count(OUTGOING_CHAT), 0);
    }

    #[tokio::test]
    async fn test_close_twice() {
        let (deps, mut events) = deps();
        let (writer, reader, mut sent, _frames) = fake::pair();
        let bridge = Bridge::start(config(), deps, writer, reader);
        events.recv().await.unwrap();

        bridge.close().await.unwrap();
        let going_away = events.recv().await.unwrap();
        assert_eq!(going_away.kind, EventKind::ServerDisconnected);
        assert_eq!(going_away.text, GOING_AWAY_NOTICE);

        assert!(matches!(bridge.close().await, Err(WebrconError::ShutdownInProgress)));
        assert!(events.try_recv().is_err());

        let mut closes = 0;
        while let Ok(frame) = sent.try_recv() {
            if frame == Sent::Close {
                closes += 1;
            }
        }
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_abnormal_disconnect_terminates() {
        let (deps, mut events) = deps();
        let (writer, reader, _sent, frames) = fake::pair();
        let bridge = Bridge::start(config(), deps, writer, reader);
        events.recv().await.unwrap();

        let mut terminated = tokio_test::task::spawn(bridge.terminated());
        assert_pending!(terminated.poll());

        frames
            .send(Err(WebrconError::Transport("connection reset".into())))
            .unwrap();

        let notice = events.recv().await.unwrap();
        assert_eq!(notice.text, "Disconnected from server!");

        let lost = bridge.terminated().await;
        assert!(lost.reason.contains("connection reset"));
        assert!(terminated.is_woken());
        let lost = assert_ready!(terminated.poll());
        assert!(lost.reason.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_close_suppresses_termination() {
        let (deps, _events) = deps();
        let (writer, reader, _sent, frames) = fake::pair();
        let bridge = Bridge::start(config(), deps, writer, reader);

        bridge.close().await.unwrap();
        drop(frames);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut terminated = tokio_test::task::spawn(bridge.terminated());
        assert_pending!(terminated.poll());
    }

    #[tokio::test]
    async fn test_connect_failure_announces_and_errors() {
        let (deps, mut events) = deps();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = config();
        config.connection.host = "127.0.0.1".into();
        config.connection.port = port;

        let err = Bridge::connect(config, deps).await.err().unwrap();
        assert!(matches!(err, WebrconError::Transport(_)));

        let notice = events.recv().await.unwrap();
        assert_eq!(notice.kind, EventKind::ServerDisconnected);
        assert_eq!(notice.text, CONNECT_FAILED_NOTICE);
    }
}
