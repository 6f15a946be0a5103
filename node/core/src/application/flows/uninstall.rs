// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `hybridadm uninstall`

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::credentials::{credential_daemons, load_existing_session};
use crate::application::daemon_manager::DaemonManager;
use crate::application::validations::{self, NodeContext};
use crate::domain::credentials::StrategyParams;
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::NodeIdentityBuilder;
use crate::domain::validation::{Informer, ValidationReport};
use crate::infrastructure::fs::remove_if_exists;

use super::{run_validations, FlowOptions, HostDeps};

/// Stop and remove everything `init` put on the host, and deregister the
/// managed instance when the node joined through SSM.
pub async fn uninstall(
    config: NodeConfig,
    deps: &HostDeps,
    options: &FlowOptions,
    informer: &dyn Informer,
) -> Result<ValidationReport> {
    config.validate().context("Invalid node configuration")?;

    let session = load_existing_session(&config, &deps.layout)
        .await
        .context("Failed to load existing AWS credentials")?;
    let identity = NodeIdentityBuilder::new(session.strategy)
        .with_node_name(session.node_name.clone())
        .freeze()?;

    let ctx = NodeContext::new(config.clone(), identity.clone(), deps.layout.clone());
    let report = run_validations(validations::uninstall_readiness(&deps.validations()), &ctx, options, informer).await?;

    let manager = DaemonManager::new(options.cancel.clone());
    let node_daemons = deps.node_daemons(&config, &identity);
    manager
        .tear_down(&node_daemons)
        .await
        .context("Failed to stop node daemons")?;

    // Deregistration needs the agent's credentials, so it happens before the
    // agent goes away.
    if let StrategyParams::Ssm(_) = config.strategy_params()? {
        deps.cloud
            .deregistrar(&session)
            .deregister(&session.node_name)
            .await
            .with_context(|| format!("Failed to deregister managed instance {}", session.node_name))?;
        info!(instance_id = %session.node_name, "Managed instance deregistered");
    }

    let mut daemons = credential_daemons(&config, &deps.credentials())?;
    manager
        .tear_down(&daemons)
        .await
        .context("Failed to stop credential daemons")?;
    daemons.extend(node_daemons);
    manager.remove(&daemons).await.context("Failed to remove daemons")?;

    // The SSM registration record belongs to the SSM agent and is left alone.
    let mut leftovers = vec![deps.layout.cluster_ca()];
    if let StrategyParams::IamRolesAnywhere(spec) = config.strategy_params()? {
        leftovers.push(deps.layout.path(&spec.aws_config_path));
    }
    for path in leftovers {
        match remove_if_exists(&path).await {
            Ok(removed) => info!(path = %path.display(), removed, "Removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
        }
    }

    info!(node_name = %identity.node_name, "Node uninstalled");
    Ok(report)
}
