// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Daemon Lifecycle Contract
//!
//! Every system service the agent manages goes through the same four phases:
//!
//! | Phase | Contract |
//! |-------|----------|
//! | `configure` | write unit/config files, overwrite-if-different, never start |
//! | `ensure_running` | enable and (re)start; already enabled/running is success |
//! | `post_launch` | bounded wait for a side effect of starting (default no-op) |
//! | `stop` | stop only when loaded/active; an unloaded unit is success |
//!
//! `remove` is only used by `uninstall`: disable the unit and delete whatever
//! `configure` wrote.
//!
//! Implementations live in `infrastructure::daemons`; sequencing across
//! daemons belongs to `application::daemon_manager`.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::policy::WaitError;
use crate::domain::service::ServiceError;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("{daemon}: failed to write {path:?}: {source}")]
    WriteFile {
        daemon: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{daemon}: {message}")]
    Configuration { daemon: String, message: String },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Wait(#[from] WaitError),
}

#[async_trait]
pub trait Daemon: Send + Sync {
    /// Short name used in logs and reports, e.g. "kubelet".
    fn name(&self) -> &str;

    async fn configure(&self) -> Result<(), DaemonError>;

    async fn ensure_running(&self) -> Result<(), DaemonError>;

    async fn post_launch(&self, _cancel: &CancellationToken) -> Result<(), DaemonError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), DaemonError>;

    async fn remove(&self) -> Result<(), DaemonError> {
        Ok(())
    }
}
