//! Transport abstractions for the WebRCON link
//!
//! Provides FrameReader/FrameWriter traits implemented over a WebSocket
//! client, so the connection manager can be driven by any duplex text-frame
//! transport.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use webrcon_core::{Result, WebrconError};

/// One event read from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text frame carrying an envelope
    Text(String),
    /// Binary frame (length only; the protocol never uses them)
    Binary(usize),
    /// Ping/pong or other control traffic
    Control,
    /// Peer closed the connection
    Closed(Option<String>),
}

/// Trait for async reading from a transport
#[async_trait]
pub trait FrameReader: Send {
    /// Read the next frame
    async fn next_frame(&mut self) -> Result<Inbound>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Write one text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Send a transport-level ping
    async fn send_ping(&mut self) -> Result<()>;

    /// Send a close frame
    async fn close(&mut self) -> Result<()>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a WebSocket connection
pub struct WsWriter {
    sink: SplitSink<WsStream, Message>,
}

/// Read half of a WebSocket connection
pub struct WsReader {
    stream: SplitStream<WsStream>,
}

/// Open a WebSocket connection to `url`, giving up after `deadline`
pub async fn connect(url: &str, deadline: Duration) -> Result<(WsWriter, WsReader)> {
    let (socket, response) = timeout(deadline, connect_async(url))
        .await
        .map_err(|_| WebrconError::Transport(format!("connect timed out after {:?}", deadline)))?
        .map_err(|e| WebrconError::Transport(format!("connect failed: {}", e)))?;
    info!("WebSocket handshake completed ({})", response.status());

    let (sink, stream) = socket.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

fn transport_error(e: tokio_tungstenite::tungstenite::Error) -> WebrconError {
    WebrconError::Transport(e.to_string())
}

#[async_trait]
impl FrameWriter for WsWriter {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(transport_error)
    }

    async fn send_ping(&mut self) -> Result<()> {
        self.sink
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(transport_error)
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await.map_err(transport_error)
    }
}

#[async_trait]
impl FrameReader for WsReader {
    async fn next_frame(&mut self) -> Result<Inbound> {
        match self.stream.next().await {
            Some(Ok(Message::Text(text))) => Ok(Inbound::Text(text)),
            Some(Ok(Message::Binary(data))) => Ok(Inbound::Binary(data.len())),
            Some(Ok(Message::Close(frame))) => {
                debug!("Received close frame: {:?}", frame);
                Ok(Inbound::Closed(frame.map(|f| f.reason.to_string())))
            }
            Some(Ok(_)) => Ok(Inbound::Control),
            Some(Err(e)) => Err(transport_error(e)),
            None => Ok(Inbound::Closed(None)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory transport used by the bridge tests

    use super::*;
    use tokio::sync::mpsc;

    /// What the fake writer recorded
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Text(String),
        Ping,
        Close,
    }

    pub struct FakeWriter {
        pub sent: mpsc::UnboundedSender<Sent>,
        pub fail: bool,
    }

    pub struct FakeReader {
        pub frames: mpsc::UnboundedReceiver<Result<Inbound>>,
    }

    /// Writer/reader pair plus the handles a test drives them with
    pub fn pair() -> (
        FakeWriter,
        FakeReader,
        mpsc::UnboundedReceiver<Sent>,
        mpsc::UnboundedSender<Result<Inbound>>,
    ) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        (
            FakeWriter {
                sent: sent_tx,
                fail: false,
            },
            FakeReader { frames: frame_rx },
            sent_rx,
            frame_tx,
        )
    }

    impl FakeWriter {
        fn record(&self, sent: Sent) -> Result<()> {
            if self.fail {
                return Err(WebrconError::Transport("broken pipe".into()));
            }
            self.sent
                .send(sent)
                .map_err(|_| WebrconError::Transport("test receiver dropped".into()))
        }
    }

    #[async_trait]
    impl FrameWriter for FakeWriter {
        async fn send_text(&mut self, text: String) -> Result<()> {
            self.record(Sent::Text(text))
        }

        async fn send_ping(&mut self) -> Result<()> {
            self.record(Sent::Ping)
        }

        async fn close(&mut self) -> Result<()> {
            self.record(Sent::Close)
        }
    }

    #[async_trait]
    impl FrameReader for FakeReader {
        async fn next_frame(&mut self) -> Result<Inbound> {
            match self.frames.recv().await {
                Some(frame) => frame,
                None => Ok(Inbound::Closed(None)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::*;
    use super::*;

    #[tokio::test]
    async fn test_fake_pair_round_trip() {
        let (mut writer, mut reader, mut sent, frames) = pair();

        writer.send_text("hello".into()).await.unwrap();
        writer.send_ping().await.unwrap();
        assert_eq!(sent.recv().await, Some(Sent::Text("hello".into())));
        assert_eq!(sent.recv().await, Some(Sent::Ping));

        frames.send(Ok(Inbound::Text("frame".into()))).unwrap();
        assert_eq!(reader.next_frame().await.unwrap(), Inbound::Text("frame".into()));

        drop(frames);
        assert_eq!(reader.next_frame().await.unwrap(), Inbound::Closed(None));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("ws://127.0.0.1:{}/secret", port);
        let err = connect(&url, Duration::from_secs(5)).await.err().unwrap();
        assert!(matches!(err, WebrconError::Transport(_)));
    }

    #[tokio::test]
    async fn test_connect_gives_up_on_silent_peer() {
        // Accepts TCP but never answers the WebSocket handshake
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/secret", listener.local_addr().unwrap());

        let err = connect(&url, Duration::from_millis(100)).await.err().unwrap();
        match err {
            WebrconError::Transport(message) => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
        drop(listener);
    }
}
