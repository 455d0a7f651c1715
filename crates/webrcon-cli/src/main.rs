//! RustBot
//!
//! Connects to a game server's WebRCON endpoint and relays its events to a
//! chat consumer over stdio:
//! - server events are written to stdout as JSON lines
//! - chat lines read from stdin are said in-game
//!
//! Exits non-zero when the server connection is lost or stdout breaks so a
//! supervisor can restart it. A closed stdin only stops the chat relay unless
//! `EXIT_ON_STDIN_EOF=true`.

mod config;
mod console;
mod supervise;

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use webrcon_bridge::{Bridge, BridgeDeps, SERVER_EVENTS};
use webrcon_bus::EventBus;
use webrcon_core::{BridgeEvent, OutgoingChat};
use webrcon_store::JsonFileStore;

use config::Settings;
use supervise::Stop;

const STDIN_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries events
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,webrcon_bridge=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let outcome = runtime.block_on(run());
    // A blocked stdin read cannot be cancelled
    runtime.shutdown_timeout(STDIN_SHUTDOWN_TIMEOUT);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = Settings::from_env()?;
    info!("RustBot v{} starting", env!("CARGO_PKG_VERSION"));

    let store = JsonFileStore::open(&settings.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", settings.database_path.display()))?;

    let events = Arc::new(EventBus::<BridgeEvent>::new());
    let outgoing = Arc::new(EventBus::<OutgoingChat>::new());

    let (_events_id, events_rx) = events.subscribe_channel(SERVER_EVENTS);
    let mut writer = tokio::spawn(console::write_events(events_rx, tokio::io::stdout()));

    let deps = BridgeDeps {
        events: events.clone(),
        outgoing: outgoing.clone(),
        store: Arc::new(store),
    };
    let bridge = match Bridge::connect(settings.bridge, deps).await {
        Ok(bridge) => bridge,
        Err(e) => {
            events.close();
            let _ = writer.await;
            return Err(e).context("Could not connect to server");
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let stop = supervise::wait_for_stop(
        shutdown_signal(),
        console::read_outgoing(stdin, outgoing.clone()),
        bridge.terminated(),
        &mut writer,
        settings.exit_on_stdin_eof,
    )
    .await;

    let writer_failed = matches!(stop, Stop::WriterFailed(_));
    let outcome = match stop {
        Stop::Signal | Stop::StdinClosed => {
            info!("Shutting down");
            bridge.close().await.context("Failed to close bridge")
        }
        Stop::ConnectionLost(reason) => Err(anyhow::anyhow!("Connection to server lost: {}", reason)),
        Stop::WriterFailed(reason) => {
            if let Err(e) = bridge.close().await {
                warn!("Failed to close bridge: {}", e);
            }
            Err(anyhow::anyhow!("Event output failed: {}", reason))
        }
    };

    events.close();
    outgoing.close();
    if !writer_failed {
        if let Ok(Err(e)) = writer.await {
            warn!("Event writer stopped: {:#}", e);
        }
    }
    outcome
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
