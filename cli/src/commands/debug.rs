// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hybridadm debug`: run every validation without changing the node

use anyhow::Result;

use hybridadm_core::application::flows;

use super::Invocation;
use crate::console::{print_summary, ConsoleInformer};

pub async fn execute(invocation: &Invocation) -> Result<()> {
    let config = invocation.load_config()?;
    let report = flows::debug(config, &invocation.host(), &invocation.options(), &ConsoleInformer).await?;
    print_summary(&report);
    Ok(())
}
