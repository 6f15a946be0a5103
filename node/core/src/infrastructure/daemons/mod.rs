// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # systemd-managed Daemons
//!
//! | Daemon | Unit | Started when |
//! |--------|------|--------------|
//! | [`KubeletDaemon`] | `kubelet` | always |
//! | [`ContainerdDaemon`] | `containerd` | always |
//! | [`SsmAgentDaemon`] | `amazon-ssm-agent` or the snap unit | SSM strategy |
//! | [`SigningHelperDaemon`] | `aws_signing_helper_update` | IAM Roles Anywhere with `enableCredentialsFile` |

pub mod containerd;
pub mod kubelet;
pub mod signing_helper;
pub mod ssm_agent;

pub use containerd::ContainerdDaemon;
pub use kubelet::KubeletDaemon;
pub use signing_helper::SigningHelperDaemon;
pub use ssm_agent::{ssm_unit_name, SsmAgentDaemon};

use std::path::Path;
use tracing::{debug, info};

use crate::domain::daemon::DaemonError;
use crate::domain::service::{ServiceManager, UnitStatus};
use crate::infrastructure::fs::{remove_if_exists, write_if_changed};

pub(crate) async fn write_file(
    daemon: &str,
    path: &Path,
    contents: &[u8],
    mode: Option<u32>,
) -> Result<(), DaemonError> {
    let changed = write_if_changed(path, contents, mode)
        .await
        .map_err(|source| DaemonError::WriteFile {
            daemon: daemon.to_string(),
            path: path.to_path_buf(),
            source,
        })?;
    if changed {
        info!(daemon = %daemon, path = %path.display(), "Wrote configuration");
    }
    Ok(())
}

pub(crate) async fn remove_file(daemon: &str, path: &Path) -> Result<(), DaemonError> {
    let removed = remove_if_exists(path)
        .await
        .map_err(|source| DaemonError::WriteFile {
            daemon: daemon.to_string(),
            path: path.to_path_buf(),
            source,
        })?;
    if removed {
        info!(daemon = %daemon, path = %path.display(), "Removed file");
    }
    Ok(())
}

/// daemon-reload, enable, restart.
pub(crate) async fn enable_and_restart(services: &dyn ServiceManager, unit: &str) -> Result<(), DaemonError> {
    services.reload().await?;
    services.enable(unit).await?;
    services.restart(unit).await?;
    Ok(())
}

pub(crate) async fn stop_if_running(services: &dyn ServiceManager, unit: &str) -> Result<(), DaemonError> {
    let status = services.status(unit).await?;
    if !status.is_running() {
        debug!(unit = %unit, status = %status, "Unit not running, nothing to stop");
        return Ok(());
    }
    services.stop(unit).await?;
    Ok(())
}

/// Disable a unit if systemd knows about it.
pub(crate) async fn disable_if_loaded(services: &dyn ServiceManager, unit: &str) -> Result<(), DaemonError> {
    if services.status(unit).await? == UnitStatus::NotLoaded {
        return Ok(());
    }
    services.disable(unit).await?;
    Ok(())
}
