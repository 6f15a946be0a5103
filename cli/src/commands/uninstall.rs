// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hybridadm uninstall`: remove the node's daemons and credentials

use anyhow::Result;
use colored::Colorize;

use hybridadm_core::application::flows;

use super::Invocation;
use crate::console::ConsoleInformer;

pub async fn execute(invocation: &Invocation) -> Result<()> {
    let config = invocation.load_config()?;
    println!("Uninstalling node from cluster {}", config.spec.cluster.name.bold());

    flows::uninstall(config, &invocation.host(), &invocation.options(), &ConsoleInformer).await?;

    println!("{}", "✓ Node uninstalled".green());
    Ok(())
}
