// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! containerd

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::daemon::{Daemon, DaemonError};
use crate::domain::service::ServiceManager;
use crate::infrastructure::layout::HostLayout;
use crate::infrastructure::templates::CONTAINERD_BASE_CONFIG;

use super::{disable_if_loaded, enable_and_restart, remove_file, stop_if_running, write_file};

pub const CONTAINERD_UNIT: &str = "containerd";

const NAME: &str = "containerd";

pub struct ContainerdDaemon {
    layout: HostLayout,
    services: Arc<dyn ServiceManager>,
    /// Operator TOML appended after the base configuration
    extra_config: String,
}

impl ContainerdDaemon {
    pub fn new(layout: HostLayout, services: Arc<dyn ServiceManager>, extra_config: impl Into<String>) -> Self {
        Self {
            layout,
            services,
            extra_config: extra_config.into(),
        }
    }

    pub fn render_config(&self) -> String {
        let extra = self.extra_config.trim();
        if extra.is_empty() {
            return CONTAINERD_BASE_CONFIG.to_string();
        }
        format!("{}\n{}\n", CONTAINERD_BASE_CONFIG, extra)
    }
}

#[async_trait]
impl Daemon for ContainerdDaemon {
    fn name(&self) -> &str {
        NAME
    }

    async fn configure(&self) -> Result<(), DaemonError> {
        write_file(
            NAME,
            &self.layout.containerd_config(),
            self.render_config().as_bytes(),
            None,
        )
        .await
    }

    async fn ensure_running(&self) -> Result<(), DaemonError> {
        enable_and_restart(self.services.as_ref(), CONTAINERD_UNIT).await
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        stop_if_running(self.services.as_ref(), CONTAINERD_UNIT).await
    }

    async fn remove(&self) -> Result<(), DaemonError> {
        disable_if_loaded(self.services.as_ref(), CONTAINERD_UNIT).await?;
        remove_file(NAME, &self.layout.containerd_config()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::fake::RecordingServices;
    use crate::domain::service::UnitStatus;

    #[test]
    fn test_extra_config_appended() {
        let daemon = ContainerdDaemon::new(
            HostLayout::host(),
            Arc::new(RecordingServices::new()),
            "[plugins.\"io.containerd.grpc.v1.cri\".registry]\nconfig_path = \"/etc/containerd/certs.d\"",
        );
        let config = daemon.render_config();
        assert!(config.starts_with(CONTAINERD_BASE_CONFIG));
        assert!(config.ends_with("config_path = \"/etc/containerd/certs.d\"\n"));

        let plain = ContainerdDaemon::new(HostLayout::host(), Arc::new(RecordingServices::new()), "  ");
        assert_eq!(plain.render_config(), CONTAINERD_BASE_CONFIG);
    }

    #[tokio::test]
    async fn test_stop_only_when_running() {
        let services = Arc::new(RecordingServices::new().with_status(CONTAINERD_UNIT, UnitStatus::Active));
        let daemon = ContainerdDaemon::new(HostLayout::host(), services.clone(), "");
        daemon.stop().await.unwrap();
        daemon.stop().await.unwrap();
        assert_eq!(services.calls(), vec!["stop containerd"]);
    }

    #[tokio::test]
    async fn test_configure_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = ContainerdDaemon::new(HostLayout::new(dir.path()), Arc::new(RecordingServices::new()), "");
        daemon.configure().await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("etc/containerd/config.toml")).unwrap();
        assert_eq!(written, CONTAINERD_BASE_CONFIG);
    }
}
