// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! amazon-ssm-agent
//!
//! The agent is installed and registered by `ssm-setup-cli`; this daemon only
//! keeps it running and waits for the credentials file it maintains.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::daemon::{Daemon, DaemonError};
use crate::domain::policy::PollPolicy;
use crate::domain::service::ServiceManager;
use crate::infrastructure::layout::HostLayout;
use crate::infrastructure::os_release::read_os_id;
use crate::infrastructure::wait::wait_for_file;

use super::{disable_if_loaded, enable_and_restart, stop_if_running};

pub const SSM_AGENT_UNIT: &str = "amazon-ssm-agent";
pub const SSM_AGENT_SNAP_UNIT: &str = "snap.amazon-ssm-agent.amazon-ssm-agent";

const NAME: &str = "ssm-agent";

/// Ubuntu ships the agent as a snap.
pub fn ssm_unit_name(os_id: &str) -> &'static str {
    if os_id == "ubuntu" {
        SSM_AGENT_SNAP_UNIT
    } else {
        SSM_AGENT_UNIT
    }
}

pub struct SsmAgentDaemon {
    layout: HostLayout,
    services: Arc<dyn ServiceManager>,
    unit: &'static str,
    credentials_wait: PollPolicy,
}

impl SsmAgentDaemon {
    pub fn new(
        layout: HostLayout,
        services: Arc<dyn ServiceManager>,
        os_id: &str,
        credentials_wait: PollPolicy,
    ) -> Self {
        Self {
            layout,
            services,
            unit: ssm_unit_name(os_id),
            credentials_wait,
        }
    }

    /// Resolve the unit name from the layout's `/etc/os-release`.
    pub fn detect(layout: HostLayout, services: Arc<dyn ServiceManager>, credentials_wait: PollPolicy) -> Self {
        let os_id = read_os_id(&layout.os_release()).unwrap_or_else(|e| {
            debug!(error = %e, "Could not read os-release, assuming a non-snap install");
            String::new()
        });
        Self::new(layout, services, &os_id, credentials_wait)
    }

    pub fn unit(&self) -> &str {
        self.unit
    }
}

#[async_trait]
impl Daemon for SsmAgentDaemon {
    fn name(&self) -> &str {
        NAME
    }

    async fn configure(&self) -> Result<(), DaemonError> {
        debug!(unit = %self.unit, "SSM agent is configured by its installer");
        Ok(())
    }

    async fn ensure_running(&self) -> Result<(), DaemonError> {
        enable_and_restart(self.services.as_ref(), self.unit).await
    }

    async fn post_launch(&self, cancel: &CancellationToken) -> Result<(), DaemonError> {
        let path = self.layout.ssm_credentials();
        info!(path = %path.display(), "Waiting for SSM agent credentials");
        wait_for_file(&path, self.credentials_wait, cancel).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        stop_if_running(self.services.as_ref(), self.unit).await
    }

    async fn remove(&self) -> Result<(), DaemonError> {
        disable_if_loaded(self.services.as_ref(), self.unit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::WaitError;
    use crate::domain::service::fake::RecordingServices;
    use std::time::Duration;

    fn quick_wait() -> PollPolicy {
        PollPolicy::new(Duration::from_millis(5), Duration::from_millis(20))
    }

    #[test]
    fn test_unit_name_per_os() {
        assert_eq!(ssm_unit_name("ubuntu"), "snap.amazon-ssm-agent.amazon-ssm-agent");
        assert_eq!(ssm_unit_name("rhel"), "amazon-ssm-agent");
        assert_eq!(ssm_unit_name(""), "amazon-ssm-agent");
    }

    #[test]
    fn test_detect_reads_os_release() {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::new(dir.path());
        std::fs::create_dir_all(dir.path().join("etc")).unwrap();
        std::fs::write(layout.os_release(), "ID=ubuntu\n").unwrap();
        let daemon = SsmAgentDaemon::detect(layout, Arc::new(RecordingServices::new()), quick_wait());
        assert_eq!(daemon.unit(), SSM_AGENT_SNAP_UNIT);

        let empty = tempfile::tempdir().unwrap();
        let daemon = SsmAgentDaemon::detect(
            HostLayout::new(empty.path()),
            Arc::new(RecordingServices::new()),
            quick_wait(),
        );
        assert_eq!(daemon.unit(), SSM_AGENT_UNIT);
    }

    #[tokio::test]
    async fn test_post_launch_waits_for_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::new(dir.path());
        let daemon = SsmAgentDaemon::new(layout.clone(), Arc::new(RecordingServices::new()), "rhel", quick_wait());

        let err = daemon.post_launch(&CancellationToken::new()).await.unwrap_err();
        match err {
            DaemonError::Wait(WaitError::TimedOut { condition, .. }) => {
                assert!(condition.ends_with("root/.aws/credentials"))
            }
            other => panic!("unexpected error: {other}"),
        }

        std::fs::create_dir_all(dir.path().join("root/.aws")).unwrap();
        std::fs::write(layout.ssm_credentials(), "[default]\n").unwrap();
        daemon.post_launch(&CancellationToken::new()).await.unwrap();
    }
}
