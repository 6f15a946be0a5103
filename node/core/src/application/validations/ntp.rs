// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Clock synchronisation.
//!
//! chrony is asked first; hosts running systemd-timesyncd answer through
//! `timedatectl`. An unsynchronised clock is reported but does not stop the
//! flow.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::debug;

use crate::domain::validation::{CheckResult, CheckStatus, Validation, ValidationError};
use crate::infrastructure::command::CommandRunner;

use super::{NodeContext, NTP_VALIDATION};

static CHRONY_SYNCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Leap status\s*:\s*Normal\s*$").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
#[error("system clock is not synchronized with an NTP source")]
pub struct ClockNotSynchronized;

pub struct NtpValidation {
    runner: Arc<dyn CommandRunner>,
}

impl NtpValidation {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn chrony_synced(&self) -> bool {
        match self.runner.run("chronyc", &["tracking"]).await {
            Ok(output) if output.success() => CHRONY_SYNCED.is_match(&output.stdout),
            Ok(output) => {
                debug!(output = %output.combined(), "chronyc tracking failed");
                false
            }
            Err(e) => {
                debug!(error = %e, "chronyc is not available");
                false
            }
        }
    }

    async fn timedatectl_synced(&self) -> bool {
        match self
            .runner
            .run("timedatectl", &["show", "-p", "NTPSynchronized", "--value"])
            .await
        {
            Ok(output) => output.success() && output.stdout.trim() == "yes",
            Err(e) => {
                debug!(error = %e, "timedatectl is not available");
                false
            }
        }
    }
}

#[async_trait]
impl Validation<NodeContext> for NtpValidation {
    fn name(&self) -> &str {
        NTP_VALIDATION
    }

    fn description(&self) -> &str {
        "Validating system clock synchronization"
    }

    async fn run(&self, _ctx: &NodeContext) -> CheckResult {
        if self.chrony_synced().await || self.timedatectl_synced().await {
            return Ok(CheckStatus::Passed);
        }
        Err(ValidationError::warning(ClockNotSynchronized).with_remediation(
            "Enable and start an NTP client (chronyd or systemd-timesyncd). Certificate validation and AWS request signing depend on an accurate clock.",
        ))
    }
}
