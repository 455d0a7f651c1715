//! Outbound relay: chat-side messages become in-game `say` commands

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};
use webrcon_core::{Envelope, OutgoingChat, WebrconError};

use crate::connection::Connection;

/// `say {prefix} {actor}: {text}`
pub fn format_outgoing(prefix: &str, chat: &OutgoingChat) -> Envelope {
    let line = if prefix.is_empty() {
        format!("{}: {}", chat.actor, chat.text)
    } else {
        format!("{} {}: {}", prefix, chat.actor, chat.text)
    };
    Envelope::say(&line)
}

/// Forward outgoing chat until the queue closes or the bridge shuts down
pub(crate) async fn run(
    connection: Arc<Connection>,
    mut outgoing: mpsc::Receiver<OutgoingChat>,
    prefix: String,
) {
    while let Some(chat) = outgoing.recv().await {
        if connection.is_shutting_down() {
            break;
        }

        debug!(actor = %chat.actor, "Relaying chat to server");
        match connection.send_envelope(&format_outgoing(&prefix, &chat)).await {
            Ok(()) => {}
            Err(WebrconError::ShutdownInProgress) => break,
            Err(e) => {
                error!("Failed to relay chat: {}", e);
                connection.handle_disconnect(&e.to_string()).await;
                break;
            }
        }
    }
    debug!("Outbound relay stopped");
}
