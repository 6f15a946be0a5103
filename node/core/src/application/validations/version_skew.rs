// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! kubelet version against the control plane.
//!
//! Kubernetes supports a kubelet up to three minor versions older than the
//! API server and never newer.

use async_trait::async_trait;
use regex::Regex;
use semver::Version;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use crate::domain::validation::{CheckResult, CheckStatus, Validation, ValidationError};
use crate::infrastructure::command::{run_checked, CommandRunner};

use super::{NodeContext, VERSION_SKEW_VALIDATION};

/// Oldest supported kubelet, in minor versions behind the control plane.
pub const MAX_KUBELET_MINOR_SKEW: u64 = 3;

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?(\d+)\.(\d+)(?:\.(\d+))?").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionSkewError {
    #[error("could not find a version in '{0}'")]
    Unparseable(String),

    #[error("kubelet {kubelet} is not supported by control plane {cluster}: kubelet must be between {oldest} and {cluster}")]
    Unsupported {
        kubelet: String,
        cluster: String,
        oldest: String,
    },
}

/// First `major.minor[.patch]` in `text`.
pub fn parse_version(text: &str) -> Result<Version, VersionSkewError> {
    let caps = VERSION
        .captures(text)
        .ok_or_else(|| VersionSkewError::Unparseable(text.trim().to_string()))?;
    let part = |i: usize| {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<u64>())
            .map_err(|_| VersionSkewError::Unparseable(text.trim().to_string()))
    };
    Ok(Version::new(part(1)?, part(2)?, part(3)?))
}

pub fn check_skew(kubelet: &Version, cluster: &Version) -> Result<(), VersionSkewError> {
    let oldest_minor = cluster.minor.saturating_sub(MAX_KUBELET_MINOR_SKEW);
    let supported = kubelet.major == cluster.major
        && kubelet.minor <= cluster.minor
        && kubelet.minor >= oldest_minor;
    if supported {
        return Ok(());
    }
    Err(VersionSkewError::Unsupported {
        kubelet: format!("{}.{}", kubelet.major, kubelet.minor),
        cluster: format!("{}.{}", cluster.major, cluster.minor),
        oldest: format!("{}.{}", cluster.major, oldest_minor),
    })
}

pub struct VersionSkewValidation {
    runner: Arc<dyn CommandRunner>,
}

impl VersionSkewValidation {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Validation<NodeContext> for VersionSkewValidation {
    fn name(&self) -> &str {
        VERSION_SKEW_VALIDATION
    }

    fn description(&self) -> &str {
        "Validating kubelet version skew against the control plane"
    }

    async fn run(&self, ctx: &NodeContext) -> CheckResult {
        let Some(cluster) = &ctx.cluster else {
            return Ok(CheckStatus::skipped(ctx.cluster_skip_reason()));
        };
        let Some(cluster_version) = cluster.version.as_deref() else {
            return Ok(CheckStatus::skipped("control plane did not report its version"));
        };
        let cluster_version = parse_version(cluster_version).map_err(ValidationError::fatal)?;

        let output = run_checked(self.runner.as_ref(), "kubelet", &["--version"])
            .await
            .map_err(|e| {
                ValidationError::fatal(e)
                    .with_remediation("Install kubelet with `hybridadm upgrade <version>` before validating the node.")
            })?;
        let kubelet_version = parse_version(&output.stdout).map_err(ValidationError::fatal)?;

        check_skew(&kubelet_version, &cluster_version).map_err(|e| {
            ValidationError::fatal(e).with_remediation(format!(
                "Run `hybridadm upgrade {}.{}.0` or a later patch release of that minor version.",
                cluster_version.major, cluster_version.minor
            ))
        })?;
        Ok(CheckStatus::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validations::fixtures::context;
    use crate::infrastructure::command::fake::ScriptedRunner;

    fn v(text: &str) -> Version {
        parse_version(text).unwrap()
    }

    #[test]
    fn test_parse_versions() {
        assert_eq!(v("Kubernetes v1.31.2"), Version::new(1, 31, 2));
        assert_eq!(v("1.30"), Version::new(1, 30, 0));
        assert!(parse_version("kubelet").is_err());
    }

    #[test]
    fn test_skew_window() {
        let cluster = v("1.31");
        for ok in ["1.31.0", "1.30.5", "1.28.1"] {
            assert!(check_skew(&v(ok), &cluster).is_ok(), "{ok}");
        }
        for bad in ["1.32.0", "1.27.9", "2.31.0"] {
            assert!(check_skew(&v(bad), &cluster).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_unsupported_kubelet_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().respond("kubelet --version", 0, "Kubernetes v1.26.0\n", "");
        let err = VersionSkewValidation::new(Arc::new(runner))
            .run(&context(dir.path()))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "kubelet 1.26 is not supported by control plane 1.31: kubelet must be between 1.28 and 1.31"
        );
    }

    #[tokio::test]
    async fn test_missing_kubelet_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().missing("kubelet");
        let err = VersionSkewValidation::new(Arc::new(runner))
            .run(&context(dir.path()))
            .await
            .unwrap_err();
        assert!(err.remediation().unwrap().contains("hybridadm upgrade"));
    }

    #[tokio::test]
    async fn test_supported_kubelet_passes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().respond("kubelet --version", 0, "Kubernetes v1.31.4\n", "");
        let status = VersionSkewValidation::new(Arc::new(runner))
            .run(&context(dir.path()))
            .await
            .unwrap();
        assert_eq!(status, CheckStatus::Passed);
    }
}
