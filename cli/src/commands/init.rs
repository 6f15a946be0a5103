// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hybridadm init`: bootstrap the node and join the cluster

use anyhow::Result;
use colored::Colorize;

use hybridadm_core::application::flows;

use super::Invocation;
use crate::console::{print_summary, ConsoleInformer};

pub async fn execute(invocation: &Invocation) -> Result<()> {
    let config = invocation.load_config()?;
    println!("Initializing node for cluster {}", config.spec.cluster.name.bold());

    let outcome = flows::init(config, &invocation.host(), &invocation.options(), &ConsoleInformer).await?;

    print_summary(&outcome.report);
    println!(
        "{}",
        format!("✓ Node {} initialized", outcome.identity.node_name).green()
    );
    Ok(())
}
