// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process shutdown. The first SIGINT or SIGTERM cancels one token that the
//! gateway, the outbox worker and the fanout subscriber share.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Returns a token cancelled by the first termination signal.
///
/// The listening task ends when the token is cancelled by anyone else.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            signal = termination() => {
                info!(signal, "shutdown signal received");
                cancel.cancel();
            }
            _ = cancel.cancelled() => debug!("shutdown requested without a signal"),
        }
    });

    token
}

/// Resolves with the name of the first termination signal.
#[cfg(unix)]
async fn termination() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            _ = interrupt() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        },
        Err(e) => {
            warn!(error = %e, "SIGTERM listener unavailable");
            interrupt().await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn termination() -> &'static str {
    interrupt().await;
    "ctrl-c"
}

/// Ctrl+C. Never resolves if the listener cannot be installed.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "SIGINT listener unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn token_starts_live() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn manual_cancel_is_observed_by_clones() {
        let token = install_signal_handler();
        let observer = token.clone();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), observer.cancelled())
            .await
            .unwrap();
    }
}
