// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hybridadm upgrade <version>`: move the node to another Kubernetes version

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use semver::Version;
use thiserror::Error;

use hybridadm_core::application::flows;

use super::Invocation;
use crate::console::{print_summary, ConsoleInformer};

#[derive(Args, Debug)]
pub struct UpgradeCommand {
    /// Target Kubernetes version, e.g. 1.31 or v1.31.2
    #[arg(id = "target_version", value_name = "VERSION", value_parser = parse_target_version)]
    pub version: Version,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a Kubernetes version (expected MAJOR.MINOR or MAJOR.MINOR.PATCH)")]
pub struct InvalidVersion(String);

/// Accepts `1.31`, `1.31.2` and the `v`-prefixed forms.
pub fn parse_target_version(raw: &str) -> Result<Version, InvalidVersion> {
    let trimmed = raw.trim().trim_start_matches('v');
    let full = if trimmed.matches('.').count() == 1 {
        format!("{}.0", trimmed)
    } else {
        trimmed.to_string()
    };
    Version::parse(&full).map_err(|_| InvalidVersion(raw.to_string()))
}

pub async fn execute(command: UpgradeCommand, invocation: &Invocation) -> Result<()> {
    let config = invocation.load_config()?;
    println!("Upgrading node to Kubernetes {}", command.version.to_string().bold());

    let report = flows::upgrade(
        config,
        &command.version,
        &invocation.host(),
        &invocation.options(),
        &ConsoleInformer,
    )
    .await?;

    print_summary(&report);
    println!("{}", format!("✓ Node upgraded to {}", command.version).green());
    Ok(())
}
