// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SSM hybrid activation via `ssm-setup-cli`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::domain::node_config::SsmSpec;
use crate::domain::registration::{RegistrarError, SsmRegistrar};
use crate::infrastructure::command::CommandRunner;

pub const SSM_SETUP_CLI_PATH: &str = "/opt/ssm/ssm-setup-cli";

pub struct SsmSetupCli {
    runner: Arc<dyn CommandRunner>,
    binary: String,
}

impl SsmSetupCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            binary: SSM_SETUP_CLI_PATH.to_string(),
        }
    }
}

#[async_trait]
impl SsmRegistrar for SsmSetupCli {
    async fn register(&self, activation: &SsmSpec, region: &str) -> Result<(), RegistrarError> {
        let code = format!("-activation-code={}", activation.activation_code);
        let id = format!("-activation-id={}", activation.activation_id);
        let region_arg = format!("-region={}", region);

        info!(activation_id = %activation.activation_id, region = %region, "Registering with SSM");
        let output = self
            .runner
            .run(&self.binary, &["-register", &code, &id, &region_arg])
            .await
            .map_err(|e| RegistrarError {
                output: e.to_string(),
            })?;

        if output.success() {
            Ok(())
        } else {
            Err(RegistrarError {
                output: output.combined(),
            })
        }
    }
}
