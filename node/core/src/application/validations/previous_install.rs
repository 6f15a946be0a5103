// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Leftovers of an earlier installation.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::service::ServiceManager;
use crate::domain::validation::{CheckResult, CheckStatus, Validation, ValidationError};
use crate::infrastructure::daemons::containerd::CONTAINERD_UNIT;
use crate::infrastructure::daemons::kubelet::KUBELET_UNIT;

use super::{NodeContext, PREVIOUS_INSTALL_VALIDATION};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("services from a previous installation are running: {}", .units.join(", "))]
pub struct PreviousInstallDetected {
    pub units: Vec<String>,
}

/// Which flow the check guards. Only the advice differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Bootstrap,
    Removal,
}

impl InstallPhase {
    fn remediation(self) -> &'static str {
        match self {
            Self::Bootstrap => {
                "Run `hybridadm uninstall` first if this node was previously joined to a different cluster."
            }
            Self::Removal => "These services are still active; continuing will stop and disable them.",
        }
    }
}

pub struct PreviousInstallValidation {
    services: Arc<dyn ServiceManager>,
    phase: InstallPhase,
}

impl PreviousInstallValidation {
    pub fn new(services: Arc<dyn ServiceManager>, phase: InstallPhase) -> Self {
        Self { services, phase }
    }
}

#[async_trait]
impl Validation<NodeContext> for PreviousInstallValidation {
    fn name(&self) -> &str {
        PREVIOUS_INSTALL_VALIDATION
    }

    fn description(&self) -> &str {
        "Checking for a previous installation"
    }

    async fn run(&self, _ctx: &NodeContext) -> CheckResult {
        let mut running = Vec::new();
        for unit in [KUBELET_UNIT, CONTAINERD_UNIT] {
            match self.services.status(unit).await {
                Ok(status) if status.is_running() => running.push(unit.to_string()),
                Ok(_) => {}
                Err(e) => debug!(unit = %unit, error = %e, "Could not read unit status"),
            }
        }
        if running.is_empty() {
            return Ok(CheckStatus::Passed);
        }
        Err(ValidationError::warning(PreviousInstallDetected { units: running })
            .with_remediation(self.phase.remediation()))
    }
}
