//! Connection manager for the WebRCON link
//!
//! Owns the write half of the transport behind a single lock so the
//! keepalive, poller and relay tasks never interleave frames, and turns
//! transport failures into one terminal [`ConnectionLost`] signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, interval_at, sleep, timeout};
use tracing::{debug, error, info, trace, warn};
use webrcon_core::{Envelope, EventKind, Result, WebrconError};

use crate::config::ConnectionConfig;
use crate::handler::FrameHandler;
use crate::publisher::EventPublisher;
use crate::transport::{FrameReader, FrameWriter, Inbound};

pub const CONNECTED_NOTICE: &str = "Connected to the server";
pub const DISCONNECTED_NOTICE: &str = "Disconnected from server!";
pub const CONNECT_FAILED_NOTICE: &str = "Cannot connect to server!";
pub const GOING_AWAY_NOTICE: &str = "Going away, see you in a bit..";

/// Terminal signal raised when the link to the server is lost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLost {
    pub reason: String,
}

impl ConnectionLost {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Guarded send path plus shutdown/loss state
pub struct Connection {
    writer: Mutex<Box<dyn FrameWriter>>,
    config: ConnectionConfig,
    publisher: EventPublisher,
    shutting_down: AtomicBool,
    lost_reported: AtomicBool,
    lost: watch::Sender<Option<ConnectionLost>>,
}

impl Connection {
    pub fn new(
        writer: Box<dyn FrameWriter>,
        config: ConnectionConfig,
        publisher: EventPublisher,
    ) -> Arc<Self> {
        let (lost, _rx) = watch::channel(None);
        Arc::new(Self {
            writer: Mutex::new(writer),
            config,
            publisher,
            shutting_down: AtomicBool::new(false),
            lost_reported: AtomicBool::new(false),
            lost,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Send one text frame under the write lock, with the write deadline
    pub async fn send_frame(&self, text: String) -> Result<()> {
        if self.is_shutting_down() {
            return Err(WebrconError::ShutdownInProgress);
        }
        trace!(len = text.len(), "Sending frame");

        let mut writer = self.writer.lock().await;
        timeout(self.config.write_timeout, writer.send_text(text))
            .await
            .map_err(|_| WebrconError::Transport("write timed out".into()))?
    }

    /// Serialize and send an envelope
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        self.send_frame(envelope.to_text()?).await
    }

    /// Send a transport-level ping
    pub async fn ping(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        timeout(self.config.write_timeout, writer.send_ping())
            .await
            .map_err(|_| WebrconError::Transport("ping timed out".into()))?
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Mark the connection as shutting down. Returns `false` if it already was.
    pub fn begin_shutdown(&self) -> bool {
        !self.shutting_down.swap(true, Ordering::SeqCst)
    }

    /// Close the transport
    pub async fn close_transport(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        timeout(self.config.write_timeout, writer.close())
            .await
            .map_err(|_| WebrconError::Transport("close timed out".into()))?
    }

    /// Abnormal disconnect: notify, wait the grace period, then raise the
    /// terminal signal. No-op during shutdown or once already reported.
    pub async fn handle_disconnect(&self, reason: &str) {
        if self.is_shutting_down() {
            debug!(reason, "Disconnect during shutdown");
            return;
        }
        if self.lost_reported.swap(true, Ordering::SeqCst) {
            return;
        }

        error!(reason, "Disconnected from server");
        self.publisher.notice(EventKind::ServerDisconnected, DISCONNECTED_NOTICE);
        sleep(self.config.disconnect_grace).await;
        self.lost.send_replace(Some(ConnectionLost::new(reason)));
    }

    /// Watch for the terminal signal
    pub fn subscribe_lost(&self) -> watch::Receiver<Option<ConnectionLost>> {
        self.lost.subscribe()
    }
}

/// Read frames until the transport fails, closes or goes silent for longer
/// than the pong window
pub(crate) async fn read_loop<R: FrameReader>(
    connection: Arc<Connection>,
    mut reader: R,
    handler: FrameHandler,
) {
    let window = connection.config().pong_timeout;

    loop {
        let reason = match timeout(window, reader.next_frame()).await {
            Err(_) => "no traffic within the pong window".to_string(),
            Ok(Ok(Inbound::Text(text))) => {
                handler.handle(&text).await;
                continue;
            }
            Ok(Ok(Inbound::Binary(len))) => {
                warn!(len, "Ignoring binary frame");
                continue;
            }
            Ok(Ok(Inbound::Control)) => continue,
            Ok(Ok(Inbound::Closed(reason))) => {
                format!("closed by peer ({})", reason.unwrap_or_default())
            }
            Ok(Err(e)) => e.to_string(),
        };

        connection.handle_disconnect(&reason).await;
        break;
    }
    debug!("Reader task stopped");
}

/// Ping the server every `ping_period` until shutdown or a failed ping
pub(crate) async fn keepalive(connection: Arc<Connection>) {
    let period = connection.config().ping_period();
    let mut ticker = interval_at(Instant::now() + period, period);
    info!("Keepalive every {:?}", period);

    loop {
        ticker.tick().await;
        if connection.is_shutting_down() {
            break;
        }
        if let Err(e) = connection.ping().await {
            if !connection.is_shutting_down() {
                error!("Failed to send ping: {}", e);
                connection.handle_disconnect(&e.to_string()).await;
            }
            break;
        }
    }
    debug!("Keepalive task stopped");
}
