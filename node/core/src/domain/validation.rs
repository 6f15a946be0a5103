// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Node Validation Domain
//!
//! Validations are named, stateless checks of host and cluster state. Instead
//! of inferring how bad a failure is from its type, every failure carries an
//! explicit classification:
//!
//! | Type | Description |
//! |------|-------------|
//! | `Severity::Fatal` | stops the remaining checks and the surrounding flow |
//! | `Severity::Warning` | surfaced to the operator, the flow continues |
//! | `CheckStatus::Skipped` | a dependency of the check is unavailable |
//!
//! Remediation text is attached with [`ValidationError::with_remediation`],
//! which keeps the underlying cause reachable through [`ValidationError::is`]
//! and [`ValidationError::downcast_ref`].

use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Warning,
}

/// Failure of a single validation.
pub struct ValidationError {
    severity: Severity,
    remediation: Option<String>,
    cause: anyhow::Error,
}

impl ValidationError {
    pub fn fatal(cause: impl Into<anyhow::Error>) -> Self {
        Self {
            severity: Severity::Fatal,
            remediation: None,
            cause: cause.into(),
        }
    }

    pub fn warning(cause: impl Into<anyhow::Error>) -> Self {
        Self {
            severity: Severity::Warning,
            remediation: None,
            cause: cause.into(),
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Whether the wrapped cause is (or was built from) an `E`.
    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.cause.is::<E>()
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.cause.downcast_ref::<E>()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationError")
            .field("severity", &self.severity)
            .field("remediation", &self.remediation)
            .field("cause", &self.cause)
            .finish()
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.source()
    }
}

/// Non-failing result of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Skipped { reason: String },
}

impl CheckStatus {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

pub type CheckResult = Result<CheckStatus, ValidationError>;

/// A named check over a context `C`.
///
/// Implementations must be idempotent: running twice against unchanged state
/// yields the same status, severity and message.
#[async_trait]
pub trait Validation<C: ?Sized + Sync>: Send + Sync {
    fn name(&self) -> &str;

    /// One line shown to the operator while the check runs.
    fn description(&self) -> &str;

    async fn run(&self, ctx: &C) -> CheckResult;
}

/// Observer notified around each executed validation.
pub trait Informer: Send + Sync {
    fn starting(&self, name: &str, description: &str);
    fn done(&self, name: &str, result: &CheckResult);
}

#[derive(Debug)]
pub struct ValidationRecord {
    pub name: String,
    pub result: CheckResult,
}

/// Outcome of running a registry of validations, in execution order.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub records: Vec<ValidationRecord>,
}

impl ValidationReport {
    pub fn push(&mut self, name: impl Into<String>, result: CheckResult) {
        self.records.push(ValidationRecord {
            name: name.into(),
            result,
        });
    }

    pub fn executed(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.records.iter().filter_map(|r| match &r.result {
            Err(e) if !e.is_fatal() => Some((r.name.as_str(), e)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().filter_map(|r| match &r.result {
            Ok(CheckStatus::Skipped { reason }) => Some((r.name.as_str(), reason.as_str())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("clock is off by {0}s")]
    struct ClockSkew(i64);

    #[test]
    fn test_remediation_keeps_identity() {
        let err = ValidationError::fatal(ClockSkew(90)).with_remediation("sync the clock");
        assert!(err.is::<ClockSkew>());
        assert_eq!(err.downcast_ref::<ClockSkew>(), Some(&ClockSkew(90)));
        assert_eq!(err.remediation(), Some("sync the clock"));
        assert_eq!(err.to_string(), "clock is off by 90s");
    }

    #[test]
    fn test_identity_survives_context() {
        let cause = anyhow::Error::new(ClockSkew(5)).context("ntp check");
        let err = ValidationError::warning(cause);
        assert!(!err.is_fatal());
        assert!(err.downcast_ref::<ClockSkew>().is_some());
    }

    #[test]
    fn test_report_partitions() {
        let mut report = ValidationReport::default();
        report.push("a", Ok(CheckStatus::Passed));
        report.push("b", Ok(CheckStatus::skipped("no cluster")));
        report.push("c", Err(ValidationError::warning(ClockSkew(1))));
        assert_eq!(report.executed().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.skipped().next(), Some(("b", "no cluster")));
    }
}
