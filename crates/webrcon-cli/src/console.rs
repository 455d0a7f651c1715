//! stdio chat adapter
//!
//! Server events go to stdout as one JSON object per line
//! (`{"kind":..,"actor":..,"text":..,"channel":..}`); lines of
//! `{"actor":..,"text":..}` read from stdin are relayed into the game.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrcon_bridge::OUTGOING_CHAT;
use webrcon_bus::EventBus;
use webrcon_core::{BridgeEvent, OutgoingChat};

/// Write every event as a JSON line until the event queue closes
pub async fn write_events<W>(mut events: mpsc::Receiver<BridgeEvent>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let mut line = serde_json::to_vec(&event).context("Failed to serialize event")?;
        line.push(b'\n');
        out.write_all(&line).await.context("Failed to write stdout")?;
        out.flush().await.context("Failed to flush stdout")?;
        debug!(kind = ?event.kind, "Wrote event");
    }
    Ok(())
}

/// Publish each input line as outgoing chat. Returns on EOF.
pub async fn read_outgoing<R>(input: R, outgoing: Arc<EventBus<OutgoingChat>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<OutgoingChat>(trimmed) {
            Ok(chat) => {
                outgoing.publish(OUTGOING_CHAT, chat);
            }
            Err(e) => warn!(line = trimmed, "Ignoring malformed chat line: {}", e),
        }
    }
    info!("stdin closed");
    Ok(())
}
