// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the hybridadm CLI

pub mod config;
pub mod debug;
pub mod init;
pub mod uninstall;
pub mod upgrade;

pub use self::config::ConfigCommand;
pub use self::upgrade::UpgradeCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use hybridadm_core::application::{FlowOptions, HostDeps};
use hybridadm_core::domain::node_config::NodeConfig;
use hybridadm_core::infrastructure::layout::HostLayout;

/// Global flags shared by every node command.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub skip: Vec<String>,
    pub install_root: PathBuf,
    pub cancel: CancellationToken,
}

impl Invocation {
    pub fn load_config(&self) -> Result<NodeConfig> {
        NodeConfig::load(self.config.clone()).context("Failed to load node configuration")
    }

    pub fn host(&self) -> HostDeps {
        HostDeps::system(HostLayout::new(&self.install_root))
    }

    pub fn options(&self) -> FlowOptions {
        FlowOptions {
            skip: self.skip.clone(),
            cancel: self.cancel.clone(),
        }
    }
}
