//! Graceful shutdown handling
//!
//! Listens for termination signals and reports them through a oneshot channel.

use tokio::sync::oneshot;
use tracing::{error, info};

/// Set up a shutdown signal handler
///
/// * Unix: SIGINT (Ctrl+C) and SIGTERM
/// * Elsewhere: Ctrl+C
///
/// The returned receiver resolves once a signal arrives.
pub fn setup_shutdown_handler() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = tx.send(());
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}, falling back to Ctrl+C", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received - initiating graceful shutdown");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received - initiating graceful shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received - initiating graceful shutdown"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            // Without a signal source, never trigger shutdown
            std::future::pending::<()>().await;
        }
    }
}
