// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! aws_signing_helper in `update` mode
//!
//! Keeps `/eks-hybrid/.aws/credentials` refreshed from IAM Roles Anywhere for
//! consumers that cannot run a `credential_process`.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::daemon::{Daemon, DaemonError};
use crate::domain::node_config::IamRolesAnywhereSpec;
use crate::domain::policy::PollPolicy;
use crate::domain::service::ServiceManager;
use crate::infrastructure::layout::{HostLayout, SIGNING_HELPER_CREDENTIALS_PATH};
use crate::infrastructure::templates::{TemplateEngine, SIGNING_HELPER_UNIT_TEMPLATE};
use crate::infrastructure::wait::wait_for_file;

use super::{disable_if_loaded, enable_and_restart, remove_file, stop_if_running, write_file};

pub const SIGNING_HELPER_UNIT: &str = "aws_signing_helper_update";
pub const SIGNING_HELPER_PATH: &str = "/usr/local/bin/aws_signing_helper";

const NAME: &str = "signing-helper-updater";

#[derive(Serialize)]
struct UnitContext<'a> {
    signing_helper: &'a str,
    credentials_path: &'a str,
    certificate_path: &'a str,
    private_key_path: &'a str,
    profile_arn: &'a str,
    role_arn: &'a str,
    trust_anchor_arn: &'a str,
    node_name: &'a str,
    region: &'a str,
}

pub struct SigningHelperDaemon {
    layout: HostLayout,
    services: Arc<dyn ServiceManager>,
    spec: IamRolesAnywhereSpec,
    region: String,
    credentials_wait: PollPolicy,
    templates: TemplateEngine,
}

impl SigningHelperDaemon {
    pub fn new(
        layout: HostLayout,
        services: Arc<dyn ServiceManager>,
        spec: IamRolesAnywhereSpec,
        region: impl Into<String>,
        credentials_wait: PollPolicy,
    ) -> Self {
        Self {
            layout,
            services,
            spec,
            region: region.into(),
            credentials_wait,
            templates: TemplateEngine::new(),
        }
    }

    pub fn render_unit(&self) -> Result<String, DaemonError> {
        let context = UnitContext {
            signing_helper: SIGNING_HELPER_PATH,
            credentials_path: SIGNING_HELPER_CREDENTIALS_PATH,
            certificate_path: &self.spec.certificate_path,
            private_key_path: &self.spec.private_key_path,
            profile_arn: &self.spec.profile_arn,
            role_arn: &self.spec.role_arn,
            trust_anchor_arn: &self.spec.trust_anchor_arn,
            node_name: &self.spec.node_name,
            region: &self.region,
        };
        self.templates
            .render(SIGNING_HELPER_UNIT_TEMPLATE, &context)
            .map_err(|e| DaemonError::Configuration {
                daemon: NAME.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl Daemon for SigningHelperDaemon {
    fn name(&self) -> &str {
        NAME
    }

    async fn configure(&self) -> Result<(), DaemonError> {
        let unit = self.render_unit()?;
        write_file(NAME, &self.layout.unit_file(SIGNING_HELPER_UNIT), unit.as_bytes(), None).await
    }

    async fn ensure_running(&self) -> Result<(), DaemonError> {
        enable_and_restart(self.services.as_ref(), SIGNING_HELPER_UNIT).await
    }

    async fn post_launch(&self, cancel: &CancellationToken) -> Result<(), DaemonError> {
        let path = self.layout.signing_helper_credentials();
        info!(path = %path.display(), "Waiting for signing helper credentials");
        wait_for_file(&path, self.credentials_wait, cancel).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        stop_if_running(self.services.as_ref(), SIGNING_HELPER_UNIT).await
    }

    async fn remove(&self) -> Result<(), DaemonError> {
        disable_if_loaded(self.services.as_ref(), SIGNING_HELPER_UNIT).await?;
        remove_file(NAME, &self.layout.unit_file(SIGNING_HELPER_UNIT)).await?;
        remove_file(NAME, &self.layout.signing_helper_credentials()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_config::fixtures::iam_roles_anywhere_config;
    use crate::domain::service::fake::RecordingServices;
    use std::time::Duration;

    fn spec() -> IamRolesAnywhereSpec {
        iam_roles_anywhere_config()
            .spec
            .hybrid
            .unwrap()
            .iam_roles_anywhere
            .unwrap()
    }

    #[test]
    fn test_unit_points_at_shared_credentials_file() {
        let daemon = SigningHelperDaemon::new(
            HostLayout::host(),
            Arc::new(RecordingServices::new()),
            spec(),
            "us-west-2",
            PollPolicy::new(Duration::from_secs(1), Duration::from_secs(1)),
        );
        let unit = daemon.render_unit().unwrap();
        assert!(unit.contains("Environment=\"AWS_SHARED_CREDENTIALS_FILE=/eks-hybrid/.aws/credentials\""));
        assert!(unit.contains("ExecStart=/usr/local/bin/aws_signing_helper update"));
        assert!(unit.contains("--role-session-name n1 --region us-west-2 --profile hybrid"));
    }

    #[tokio::test]
    async fn test_configure_writes_unit() {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::new(dir.path());
        let services = Arc::new(RecordingServices::new());
        let daemon = SigningHelperDaemon::new(
            layout.clone(),
            services.clone(),
            spec(),
            "us-west-2",
            PollPolicy::new(Duration::from_secs(1), Duration::from_secs(1)),
        );
        daemon.configure().await.unwrap();
        assert!(layout.unit_file(SIGNING_HELPER_UNIT).exists());
        assert!(services.calls().is_empty());
    }
}
