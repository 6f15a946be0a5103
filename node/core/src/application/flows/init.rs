// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `hybridadm init`

use anyhow::{Context, Result};
use tracing::info;

use crate::application::credentials::configure_aws;
use crate::application::daemon_manager::DaemonManager;
use crate::application::node_ip::resolve_node_ip;
use crate::application::validations::{self, NodeContext};
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::{NodeIdentity, NodeIdentityBuilder};
use crate::domain::validation::{Informer, ValidationReport};

use super::{enrich_config, run_validations, write_cluster_ca, FlowOptions, HostDeps};

#[derive(Debug)]
pub struct InitOutcome {
    pub identity: NodeIdentity,
    /// Preflight records followed by post-bootstrap records
    pub report: ValidationReport,
}

/// Bootstrap the node and join it to the cluster.
///
/// Safe to re-run: every step converges on the same host state.
pub async fn init(
    mut config: NodeConfig,
    deps: &HostDeps,
    options: &FlowOptions,
    informer: &dyn Informer,
) -> Result<InitOutcome> {
    config.validate().context("Invalid node configuration")?;

    let session = configure_aws(&config, &deps.credentials(), &options.cancel)
        .await
        .context("Failed to provision AWS credentials")?;
    let builder = NodeIdentityBuilder::new(session.strategy).with_node_name(session.node_name.clone());

    let preflight_ctx = NodeContext::new(config.clone(), builder.clone().freeze()?, deps.layout.clone());
    let mut report = run_validations(
        validations::preflight(&deps.validations()),
        &preflight_ctx,
        options,
        informer,
    )
    .await?;

    let describer = deps.cloud.cluster_describer(&session);
    let (cluster, unavailable) = enrich_config(&mut config, describer.as_ref(), false).await?;
    write_cluster_ca(&config, &deps.layout).await?;

    let (node_ip, source) = resolve_node_ip(&config.spec.kubelet, &session.node_name, deps.network.as_ref())
        .await
        .context("Failed to determine the node IP")?;
    info!(node_ip = %node_ip, source = %source, "Resolved node IP");
    let identity = builder.with_node_ip(node_ip).freeze()?;

    DaemonManager::new(options.cancel.clone())
        .bring_up(&deps.node_daemons(&config, &identity))
        .await
        .context("Failed to start node daemons")?;

    let mut ctx = NodeContext::new(config, identity.clone(), deps.layout.clone()).with_cluster(cluster);
    if let Some(reason) = unavailable {
        ctx = ctx.with_cluster_unavailable(reason);
    }
    let post = run_validations(validations::post_init(&deps.validations()), &ctx, options, informer).await?;
    report.records.extend(post.records);

    info!(node_name = %identity.node_name, "Node initialized");
    Ok(InitOutcome { identity, report })
}
