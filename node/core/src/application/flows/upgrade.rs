// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `hybridadm upgrade <version>`

use anyhow::{Context, Result};
use semver::Version;
use std::sync::Arc;
use tracing::info;

use crate::application::credentials::load_existing_session;
use crate::application::daemon_manager::DaemonManager;
use crate::application::node_ip::resolve_node_ip;
use crate::application::validations::{self, NodeContext};
use crate::domain::daemon::Daemon;
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::NodeIdentityBuilder;
use crate::domain::validation::{Informer, ValidationReport};
use crate::infrastructure::daemons::KubeletDaemon;

use super::{enrich_config, run_validations, write_cluster_ca, FlowOptions, HostDeps};

/// Replace the Kubernetes binaries with `target_version` and restart the
/// node daemons on the existing credentials.
pub async fn upgrade(
    mut config: NodeConfig,
    target_version: &Version,
    deps: &HostDeps,
    options: &FlowOptions,
    informer: &dyn Informer,
) -> Result<ValidationReport> {
    config.validate().context("Invalid node configuration")?;

    let session = load_existing_session(&config, &deps.layout)
        .await
        .context("Failed to load existing AWS credentials")?;
    let describer = deps.cloud.cluster_describer(&session);
    let (cluster, unavailable) = enrich_config(&mut config, describer.as_ref(), false).await?;
    write_cluster_ca(&config, &deps.layout).await?;

    let (node_ip, _) = resolve_node_ip(&config.spec.kubelet, &session.node_name, deps.network.as_ref())
        .await
        .context("Failed to determine the node IP")?;
    let identity = NodeIdentityBuilder::new(session.strategy)
        .with_node_name(session.node_name.clone())
        .with_node_ip(node_ip)
        .freeze()?;

    let manager = DaemonManager::new(options.cancel.clone());
    let kubelet: Arc<dyn Daemon> = Arc::new(KubeletDaemon::new(
        deps.layout.clone(),
        deps.services.clone(),
        config.clone(),
        identity.clone(),
    ));
    manager
        .tear_down(&[kubelet])
        .await
        .context("Failed to stop kubelet before upgrading")?;

    info!(version = %target_version, "Installing Kubernetes binaries");
    deps.installer
        .upgrade(target_version)
        .await
        .with_context(|| format!("Failed to install Kubernetes {}", target_version))?;

    manager
        .bring_up(&deps.node_daemons(&config, &identity))
        .await
        .context("Failed to restart node daemons")?;

    let mut ctx = NodeContext::new(config, identity, deps.layout.clone()).with_cluster(cluster);
    if let Some(reason) = unavailable {
        ctx = ctx.with_cluster_unavailable(reason);
    }
    let report = run_validations(validations::post_init(&deps.validations()), &ctx, options, informer).await?;
    info!(version = %target_version, "Node upgraded");
    Ok(report)
}
