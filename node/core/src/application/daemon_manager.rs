// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Daemon Manager
//!
//! Drives a list of daemons through their lifecycle in order.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** `configure → ensure_running → post_launch` per daemon on the
//!   way up, `stop` in reverse order on the way down
//!
//! A failure aborts the sequence. Daemons already brought up stay up: the
//! next `init` run converges them again.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::daemon::{Daemon, DaemonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configure,
    EnsureRunning,
    PostLaunch,
    Stop,
    Remove,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configure => "configure",
            Self::EnsureRunning => "ensure-running",
            Self::PostLaunch => "post-launch",
            Self::Stop => "stop",
            Self::Remove => "remove",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("{daemon} failed to {phase}: {source}")]
pub struct BringUpError {
    pub daemon: String,
    pub phase: Phase,
    #[source]
    pub source: DaemonError,
}

pub struct DaemonManager {
    cancel: CancellationToken,
}

impl DaemonManager {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub async fn bring_up(&self, daemons: &[Arc<dyn Daemon>]) -> Result<(), BringUpError> {
        for daemon in daemons {
            let name = daemon.name();
            info!(daemon = %name, "Configuring daemon");
            daemon
                .configure()
                .await
                .map_err(|source| failed(name, Phase::Configure, source))?;

            info!(daemon = %name, "Starting daemon");
            daemon
                .ensure_running()
                .await
                .map_err(|source| failed(name, Phase::EnsureRunning, source))?;

            daemon
                .post_launch(&self.cancel)
                .await
                .map_err(|source| failed(name, Phase::PostLaunch, source))?;
            info!(daemon = %name, "Daemon is up");
        }
        Ok(())
    }

    /// Stop daemons in reverse order. Every daemon is attempted; the first
    /// error is returned.
    pub async fn tear_down(&self, daemons: &[Arc<dyn Daemon>]) -> Result<(), BringUpError> {
        let mut first_error = None;
        for daemon in daemons.iter().rev() {
            let name = daemon.name();
            info!(daemon = %name, "Stopping daemon");
            if let Err(source) = daemon.stop().await {
                warn!(daemon = %name, error = %source, "Failed to stop daemon");
                first_error.get_or_insert(failed(name, Phase::Stop, source));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Disable units and delete generated files, in reverse order.
    pub async fn remove(&self, daemons: &[Arc<dyn Daemon>]) -> Result<(), BringUpError> {
        for daemon in daemons.iter().rev() {
            daemon
                .remove()
                .await
                .map_err(|source| failed(daemon.name(), Phase::Remove, source))?;
        }
        Ok(())
    }
}

fn failed(daemon: &str, phase: Phase, source: DaemonError) -> BringUpError {
    BringUpError {
        daemon: daemon.to_string(),
        phase,
        source,
    }
}
