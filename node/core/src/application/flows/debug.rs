// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `hybridadm debug`
//!
//! Read-only: runs every validation against the node as it is and reports.
//! Nothing on the host is written, started or stopped.

use anyhow::{Context, Result};
use tracing::warn;

use crate::application::credentials::load_existing_session;
use crate::application::node_ip::resolve_node_ip;
use crate::application::validations::{self, NodeContext};
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::NodeIdentityBuilder;
use crate::domain::validation::{Informer, ValidationReport};

use super::{enrich_config, run_validations, FlowOptions, HostDeps};

pub async fn debug(
    mut config: NodeConfig,
    deps: &HostDeps,
    options: &FlowOptions,
    informer: &dyn Informer,
) -> Result<ValidationReport> {
    config.validate().context("Invalid node configuration")?;

    let session = load_existing_session(&config, &deps.layout)
        .await
        .context("Failed to load existing AWS credentials")?;
    let describer = deps.cloud.cluster_describer(&session);
    let (cluster, unavailable) = enrich_config(&mut config, describer.as_ref(), true).await?;

    let mut builder = NodeIdentityBuilder::new(session.strategy).with_node_name(session.node_name.clone());
    match resolve_node_ip(&config.spec.kubelet, &session.node_name, deps.network.as_ref()).await {
        Ok((ip, _)) => builder = builder.with_node_ip(ip),
        Err(e) => warn!(error = %e, "Could not determine the node IP"),
    }

    let mut ctx = NodeContext::new(config, builder.freeze()?, deps.layout.clone()).with_cluster(cluster);
    if let Some(reason) = unavailable {
        ctx = ctx.with_cluster_unavailable(reason);
    }
    run_validations(validations::full(&deps.validations()), &ctx, options, informer).await
}
