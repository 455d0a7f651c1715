//! Periodic `status` requests

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error};
use webrcon_core::{Envelope, WebrconError};

use crate::connection::Connection;

/// Request a status snapshot every `period` until the bridge shuts down
pub(crate) async fn run(connection: Arc<Connection>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let request = Envelope::status_request();

    loop {
        ticker.tick().await;
        if connection.is_shutting_down() {
            break;
        }

        match connection.send_envelope(&request).await {
            Ok(()) => debug!("Requested server status"),
            Err(WebrconError::ShutdownInProgress) => break,
            Err(e) => {
                error!("Failed to request status: {}", e);
                connection.handle_disconnect(&e.to_string()).await;
                break;
            }
        }
    }
    debug!("Status poller stopped");
}
