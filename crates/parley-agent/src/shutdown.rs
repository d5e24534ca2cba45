// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! SIGTERM and SIGINT cancel a [`CancellationToken`] shared by the HTTP
//! server and in-flight turns. Background work on the [`TaskTracker`] is
//! then given a bounded grace period.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Closes the tracker and waits up to `grace` for background tasks.
///
/// Returns `true` if every task finished in time.
pub async fn drain_background(tracker: &TaskTracker, grace: Duration) -> bool {
    tracker.close();
    if tracker.is_empty() {
        info!("no background work to drain");
        return true;
    }

    info!(tasks = tracker.len(), "waiting for background work");
    match tokio::time::timeout(grace, tracker.wait()).await {
        Ok(()) => {
            info!("background work drained");
            true
        }
        Err(_) => {
            warn!(remaining = tracker.len(), "grace period elapsed, abandoning background work");
            false
        }
    }
}
