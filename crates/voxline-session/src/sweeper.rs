// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic removal of sessions that outlived their timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::manager::SessionManager;

/// Calls [`SessionManager::cleanup_expired_sessions`] every `interval`
/// until `cancel` fires.
pub fn spawn_sweeper(
    manager: Arc<SessionManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "session sweeper started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    let removed = manager.cleanup_expired_sessions().await;
                    debug!(removed, active = manager.active_session_count(), "sweep finished");
                }
            }
        }
        info!("session sweeper stopped");
    })
}
