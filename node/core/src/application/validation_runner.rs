// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Validation Runner
//!
//! Executes an ordered registry of validations against one context.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Sequence checks, honour the skip list, stop on the first
//!   fatal failure
//!
//! Checks run one at a time in registry order. Skipped checks are not
//! reported to the [`Informer`] at all; warnings are recorded and the run
//! continues.

use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::validation::{
    CheckResult, CheckStatus, Informer, Validation, ValidationError, ValidationReport,
};

/// A fatal validation stopped the run.
#[derive(Debug, Error)]
#[error("{check}: {error}")]
pub struct ValidationFailed {
    pub check: String,
    #[source]
    pub error: ValidationError,
    /// Checks that ran before the failing one
    pub report: ValidationReport,
}

pub struct ValidationRunner<C: ?Sized + Sync> {
    validations: Vec<Box<dyn Validation<C>>>,
    skip: HashSet<String>,
}

impl<C: ?Sized + Sync> ValidationRunner<C> {
    pub fn new(validations: Vec<Box<dyn Validation<C>>>) -> Self {
        Self {
            validations,
            skip: HashSet::new(),
        }
    }

    /// Skip checks by exact name. Names that match nothing are ignored.
    pub fn skip<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.validations.iter().any(|v| v.name() == name) {
                debug!(name = %name, "Skip requested for an unknown validation");
            }
            self.skip.insert(name);
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validations.iter().map(|v| v.name())
    }

    pub async fn run(&self, ctx: &C, informer: &dyn Informer) -> Result<ValidationReport, ValidationFailed> {
        let mut report = ValidationReport::default();

        for validation in &self.validations {
            let name = validation.name();
            if self.skip.contains(name) {
                info!(validation = %name, "Skipping validation");
                continue;
            }

            informer.starting(name, validation.description());
            let result = validation.run(ctx).await;
            informer.done(name, &result);

            match result {
                Err(error) if error.is_fatal() => {
                    return Err(ValidationFailed {
                        check: name.to_string(),
                        error,
                        report,
                    });
                }
                result => report.push(name, result),
            }
        }

        Ok(report)
    }
}

/// Informer that reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInformer;

impl Informer for TracingInformer {
    fn starting(&self, name: &str, description: &str) {
        info!(validation = %name, "{}", description);
    }

    fn done(&self, name: &str, result: &CheckResult) {
        match result {
            Ok(CheckStatus::Passed) => info!(validation = %name, "Validation passed"),
            Ok(CheckStatus::Skipped { reason }) => {
                info!(validation = %name, reason = %reason, "Validation not applicable")
            }
            Err(e) => warn!(
                validation = %name,
                severity = ?e.severity(),
                remediation = e.remediation().unwrap_or_default(),
                "Validation failed: {}",
                e
            ),
        }
    }
}
