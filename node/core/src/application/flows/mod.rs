// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Operator Flows
//!
//! The four top-level operations behind the CLI commands.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Compose credentials, enrichment, daemons and validations
//!   into `init`, `upgrade`, `uninstall` and `debug`
//!
//! Every host dependency comes in through [`HostDeps`], so the flows run
//! unchanged against an alternate install root and scripted seams.

pub mod debug;
pub mod init;
pub mod uninstall;
pub mod upgrade;

pub use debug::debug;
pub use init::{init, InitOutcome};
pub use uninstall::uninstall;
pub use upgrade::upgrade;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::credentials::{AwsSession, CredentialDeps};
use crate::application::enrichment::{enrich, needs_enrichment};
use crate::application::validation_runner::ValidationRunner;
use crate::application::validations::{NodeContext, Registry, ValidationDeps};
use crate::domain::artifacts::ArtifactInstaller;
use crate::domain::cluster::{ClusterDescriber, ClusterDetails};
use crate::domain::daemon::Daemon;
use crate::domain::network::NetworkInspector;
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::NodeIdentity;
use crate::domain::registration::{ManagedInstanceDeregistrar, SsmRegistrar};
use crate::domain::service::ServiceManager;
use crate::domain::validation::{Informer, ValidationReport};
use crate::infrastructure::aws::{EksClusterDescriber, SsmDeregistrar};
use crate::infrastructure::command::{CommandRunner, TokioCommandRunner};
use crate::infrastructure::daemons::{ContainerdDaemon, KubeletDaemon};
use crate::infrastructure::fs::write_if_changed;
use crate::infrastructure::host_network::HostNetwork;
use crate::infrastructure::installer::HttpArtifactInstaller;
use crate::infrastructure::layout::HostLayout;
use crate::infrastructure::ssm_setup::SsmSetupCli;
use crate::infrastructure::systemd::Systemctl;

/// AWS API clients bound to a session.
pub trait CloudClients: Send + Sync {
    fn cluster_describer(&self, session: &AwsSession) -> Arc<dyn ClusterDescriber>;
    fn deregistrar(&self, session: &AwsSession) -> Arc<dyn ManagedInstanceDeregistrar>;
}

/// Clients backed by the AWS SDK.
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsCloudClients;

impl CloudClients for AwsCloudClients {
    fn cluster_describer(&self, session: &AwsSession) -> Arc<dyn ClusterDescriber> {
        Arc::new(EksClusterDescriber::new(&session.sdk_config))
    }

    fn deregistrar(&self, session: &AwsSession) -> Arc<dyn ManagedInstanceDeregistrar> {
        Arc::new(SsmDeregistrar::new(&session.sdk_config))
    }
}

/// Everything the flows need from the machine they run on.
#[derive(Clone)]
pub struct HostDeps {
    pub layout: HostLayout,
    pub services: Arc<dyn ServiceManager>,
    pub runner: Arc<dyn CommandRunner>,
    pub network: Arc<dyn NetworkInspector>,
    pub registrar: Arc<dyn SsmRegistrar>,
    pub installer: Arc<dyn ArtifactInstaller>,
    pub cloud: Arc<dyn CloudClients>,
}

impl HostDeps {
    /// Real host access rooted at `layout`.
    pub fn system(layout: HostLayout) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        Self {
            services: Arc::new(Systemctl::new(runner.clone())),
            network: Arc::new(HostNetwork::new()),
            registrar: Arc::new(SsmSetupCli::new(runner.clone())),
            installer: Arc::new(HttpArtifactInstaller::new(layout.clone())),
            cloud: Arc::new(AwsCloudClients),
            runner,
            layout,
        }
    }

    pub fn credentials(&self) -> CredentialDeps {
        CredentialDeps {
            layout: self.layout.clone(),
            services: self.services.clone(),
            registrar: self.registrar.clone(),
            installer: self.installer.clone(),
        }
    }

    pub fn validations(&self) -> ValidationDeps {
        ValidationDeps {
            network: self.network.clone(),
            runner: self.runner.clone(),
            services: self.services.clone(),
        }
    }

    /// containerd then kubelet, the order they must come up in.
    fn node_daemons(&self, config: &NodeConfig, identity: &NodeIdentity) -> Vec<Arc<dyn Daemon>> {
        vec![
            Arc::new(ContainerdDaemon::new(
                self.layout.clone(),
                self.services.clone(),
                config.spec.containerd.config.clone(),
            )),
            Arc::new(KubeletDaemon::new(
                self.layout.clone(),
                self.services.clone(),
                config.clone(),
                identity.clone(),
            )),
        ]
    }
}

/// Per-invocation knobs shared by every flow.
#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Validation names to skip
    pub skip: Vec<String>,
    pub cancel: CancellationToken,
}

/// Enrich the configuration and return whatever cluster details are known.
///
/// Enrichment failures are fatal unless `best_effort`. When nothing is
/// missing, the cluster is still described for the validations, and a failed
/// lookup only costs the checks that depend on it.
async fn enrich_config(
    config: &mut NodeConfig,
    describer: &dyn ClusterDescriber,
    best_effort: bool,
) -> Result<(Option<ClusterDetails>, Option<String>)> {
    if needs_enrichment(&config.spec.cluster) {
        match enrich(config, describer).await {
            Ok(details) => return Ok((details, None)),
            Err(e) if best_effort => {
                warn!(error = %e, "Cluster details unavailable");
                return Ok((None, Some(e.to_string())));
            }
            Err(e) => {
                return Err(e).context("Failed to enrich node configuration from the cluster")
            }
        }
    }

    match describer.describe_cluster(&config.spec.cluster.name).await {
        Ok(details) => Ok((Some(details), None)),
        Err(e) => {
            warn!(error = %e, "Cluster details unavailable, dependent validations will be skipped");
            Ok((None, Some(e.to_string())))
        }
    }
}

/// Write the decoded cluster CA where the kubelet and kubeconfig expect it.
async fn write_cluster_ca(config: &NodeConfig, layout: &HostLayout) -> Result<()> {
    let ca = config
        .spec
        .cluster
        .certificate_authority_pem()?
        .context("cluster certificate authority is unknown")?;
    let path = layout.cluster_ca();
    let changed = write_if_changed(&path, &ca, Some(0o644))
        .await
        .with_context(|| format!("Failed to write cluster CA to {:?}", path))?;
    info!(path = %path.display(), changed, "Cluster CA written");
    Ok(())
}

async fn run_validations(
    registry: Registry,
    ctx: &NodeContext,
    options: &FlowOptions,
    informer: &dyn Informer,
) -> Result<ValidationReport> {
    let report = ValidationRunner::new(registry)
        .skip(options.skip.iter().cloned())
        .run(ctx, informer)
        .await?;
    Ok(report)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::application::credentials::fake::{FakeInstaller, FakeRegistrar};
    use crate::application::enrichment::fake::FakeDescriber;
    use crate::application::node_ip::fake::FakeNetwork;
    use crate::domain::service::fake::RecordingServices;
    use crate::infrastructure::command::fake::ScriptedRunner;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeDeregistrar {
        pub deregistered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ManagedInstanceDeregistrar for FakeDeregistrar {
        async fn deregister(&self, managed_instance_id: &str) -> anyhow::Result<()> {
            self.deregistered
                .lock()
                .unwrap()
                .push(managed_instance_id.to_string());
            Ok(())
        }
    }

    pub struct FakeCloud {
        pub describer: Arc<FakeDescriber>,
        pub deregistrar: Arc<FakeDeregistrar>,
    }

    impl CloudClients for FakeCloud {
        fn cluster_describer(&self, _session: &AwsSession) -> Arc<dyn ClusterDescriber> {
            self.describer.clone()
        }

        fn deregistrar(&self, _session: &AwsSession) -> Arc<dyn ManagedInstanceDeregistrar> {
            self.deregistrar.clone()
        }
    }

    /// Scripted host with handles to inspect afterwards.
    pub struct FakeHost {
        pub deps: HostDeps,
        pub services: Arc<RecordingServices>,
        pub runner: Arc<ScriptedRunner>,
        pub installer: Arc<FakeInstaller>,
        pub registrar: Arc<FakeRegistrar>,
        pub describer: Arc<FakeDescriber>,
        pub deregistrar: Arc<FakeDeregistrar>,
    }

    impl FakeHost {
        pub fn new(layout: HostLayout, network: FakeNetwork, runner: ScriptedRunner, describer: FakeDescriber) -> Self {
            let services = Arc::new(RecordingServices::new());
            let runner = Arc::new(runner);
            let installer = Arc::new(FakeInstaller::default());
            let registrar = Arc::new(FakeRegistrar::new(layout.registration(), vec![Ok(())]));
            let describer = Arc::new(describer);
            let deregistrar = Arc::new(FakeDeregistrar::default());
            let deps = HostDeps {
                layout,
                services: services.clone(),
                runner: runner.clone(),
                network: Arc::new(network),
                registrar: registrar.clone(),
                installer: installer.clone(),
                cloud: Arc::new(FakeCloud {
                    describer: describer.clone(),
                    deregistrar: deregistrar.clone(),
                }),
            };
            Self {
                deps,
                services,
                runner,
                installer,
                registrar,
                describer,
                deregistrar,
            }
        }

        pub fn with_services(mut self, services: RecordingServices) -> Self {
            let services = Arc::new(services);
            self.deps.services = services.clone();
            self.services = services;
            self
        }
    }
}
