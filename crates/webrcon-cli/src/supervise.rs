//! What keeps the process alive, and what ends it

use anyhow::Result;
use std::future::Future;
use tokio::task::JoinError;
use tracing::{info, warn};
use webrcon_bridge::ConnectionLost;

/// Why the main loop stopped
#[derive(Debug, PartialEq, Eq)]
pub enum Stop {
    Signal,
    /// Only when exiting on stdin EOF is enabled
    StdinClosed,
    ConnectionLost(String),
    /// Nobody is consuming server events any more
    WriterFailed(String),
}

/// Wait until one of the stop conditions fires.
///
/// Closing stdin only ends relaying of outgoing chat unless `exit_on_eof`
/// is set; supervisors commonly attach stdin to `/dev/null`.
pub async fn wait_for_stop<S, I, L, W>(signal: S, input: I, lost: L, writer: W, exit_on_eof: bool) -> Stop
where
    S: Future<Output = ()>,
    I: Future<Output = Result<()>>,
    L: Future<Output = ConnectionLost>,
    W: Future<Output = std::result::Result<Result<()>, JoinError>>,
{
    tokio::pin!(signal, input, lost, writer);
    let mut reading = true;

    loop {
        tokio::select! {
            _ = &mut signal => return Stop::Signal,
            result = &mut input, if reading => {
                reading = false;
                if let Err(e) = result {
                    warn!("{:#}", e);
                }
                if exit_on_eof {
                    return Stop::StdinClosed;
                }
                info!("stdin closed; no longer relaying outgoing chat");
            }
            signal_lost = &mut lost => return Stop::ConnectionLost(signal_lost.reason),
            result = &mut writer => {
                let reason = match result {
                    Ok(Ok(())) => "event stream ended".to_string(),
                    Ok(Err(e)) => format!("{:#}", e),
                    Err(e) => e.to_string(),
                };
                return Stop::WriterFailed(reason);
            }
        }
    }
}
