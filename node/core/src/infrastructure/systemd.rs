// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! systemd service manager
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Implements `ServiceManager` by shelling out to `systemctl`

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::domain::service::{ServiceError, ServiceManager, UnitStatus};
use crate::infrastructure::command::{run_checked, CommandRunner};

const SYSTEMCTL: &str = "systemctl";

pub struct Systemctl {
    runner: Arc<dyn CommandRunner>,
}

impl Systemctl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn systemctl(&self, action: &'static str, unit: &str, args: &[&str]) -> Result<String, ServiceError> {
        run_checked(self.runner.as_ref(), SYSTEMCTL, args)
            .await
            .map(|output| output.stdout)
            .map_err(|e| ServiceError {
                action,
                unit: unit.to_string(),
                message: e.to_string(),
            })
    }
}

/// Map `systemctl show --property=LoadState,ActiveState` output to a status.
pub fn parse_unit_status(show_output: &str) -> UnitStatus {
    let mut load_state = "";
    let mut active_state = "";
    for line in show_output.lines() {
        if let Some(value) = line.strip_prefix("LoadState=") {
            load_state = value.trim();
        } else if let Some(value) = line.strip_prefix("ActiveState=") {
            active_state = value.trim();
        }
    }

    if load_state == "not-found" || load_state.is_empty() {
        return UnitStatus::NotLoaded;
    }
    match active_state {
        "active" | "reloading" => UnitStatus::Active,
        "activating" => UnitStatus::Activating,
        "failed" => UnitStatus::Failed,
        _ => UnitStatus::Inactive,
    }
}

#[async_trait]
impl ServiceManager for Systemctl {
    async fn reload(&self) -> Result<(), ServiceError> {
        self.systemctl("daemon-reload", "", &["daemon-reload"]).await?;
        Ok(())
    }

    async fn enable(&self, unit: &str) -> Result<(), ServiceError> {
        self.systemctl("enable", unit, &["enable", unit]).await?;
        info!(unit = %unit, "Unit enabled");
        Ok(())
    }

    async fn disable(&self, unit: &str) -> Result<(), ServiceError> {
        self.systemctl("disable", unit, &["disable", unit]).await?;
        info!(unit = %unit, "Unit disabled");
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<(), ServiceError> {
        self.systemctl("start", unit, &["start", unit]).await?;
        info!(unit = %unit, "Unit started");
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), ServiceError> {
        self.systemctl("restart", unit, &["restart", unit]).await?;
        info!(unit = %unit, "Unit restarted");
        Ok(())
    }

    async fn stop(&self, unit: &str) -> Result<(), ServiceError> {
        self.systemctl("stop", unit, &["stop", unit]).await?;
        info!(unit = %unit, "Unit stopped");
        Ok(())
    }

    async fn status(&self, unit: &str) -> Result<UnitStatus, ServiceError> {
        let stdout = self
            .systemctl("show", unit, &["show", unit, "--property=LoadState,ActiveState"])
            .await?;
        Ok(parse_unit_status(&stdout))
    }
}
