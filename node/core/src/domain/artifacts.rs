// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Installed binaries the agent depends on but does not build.

use async_trait::async_trait;

#[async_trait]
pub trait ArtifactInstaller: Send + Sync {
    /// Fetch a fresh copy of the SSM activation tool, replacing the current one.
    async fn reinstall_ssm_setup(&self, region: &str) -> anyhow::Result<()>;

    /// Replace the Kubernetes node binaries with `target_version`.
    async fn upgrade(&self, target_version: &semver::Version) -> anyhow::Result<()>;
}
