// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Binary downloads for the SSM activation tool and Kubernetes node binaries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::domain::artifacts::ArtifactInstaller;
use crate::infrastructure::fs::write_if_changed;
use crate::infrastructure::layout::HostLayout;
use crate::infrastructure::ssm_setup::SSM_SETUP_CLI_PATH;

const KUBERNETES_RELEASE_URL: &str = "https://dl.k8s.io/release";
const KUBERNETES_BINARIES: [(&str, &str); 2] = [("kubelet", "/usr/bin/kubelet"), ("kubectl", "/usr/bin/kubectl")];

/// Kernel architecture in the naming used by release buckets.
pub fn release_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "arm64",
        _ => "amd64",
    }
}

pub fn ssm_setup_url(region: &str, arch: &str) -> String {
    format!(
        "https://amazon-ssm-{region}.s3.{region}.amazonaws.com/latest/linux_{arch}/ssm-setup-cli"
    )
}

pub fn kubernetes_binary_url(version: &semver::Version, binary: &str, arch: &str) -> String {
    format!("{KUBERNETES_RELEASE_URL}/v{version}/bin/linux/{arch}/{binary}")
}

pub struct HttpArtifactInstaller {
    client: reqwest::Client,
    layout: HostLayout,
}

impl HttpArtifactInstaller {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            client: reqwest::Client::new(),
            layout,
        }
    }

    async fn install(&self, url: &str, host_path: &str) -> Result<PathBuf> {
        info!(url = %url, path = %host_path, "Downloading artifact");
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .with_context(|| format!("Failed to download {}", url))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        let path = self.layout.path(host_path);
        write_if_changed(&path, &bytes, Some(0o755))
            .await
            .with_context(|| format!("Failed to install {:?}", path))?;
        Ok(path)
    }
}

#[async_trait]
impl ArtifactInstaller for HttpArtifactInstaller {
    async fn reinstall_ssm_setup(&self, region: &str) -> Result<()> {
        self.install(&ssm_setup_url(region, release_arch()), SSM_SETUP_CLI_PATH)
            .await?;
        Ok(())
    }

    async fn upgrade(&self, target_version: &semver::Version) -> Result<()> {
        for (binary, host_path) in KUBERNETES_BINARIES {
            self.install(&kubernetes_binary_url(target_version, binary, release_arch()), host_path)
                .await?;
        }
        info!(version = %target_version, "Kubernetes binaries upgraded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(
            ssm_setup_url("eu-west-1", "arm64"),
            "https://amazon-ssm-eu-west-1.s3.eu-west-1.amazonaws.com/latest/linux_arm64/ssm-setup-cli"
        );
        let version = semver::Version::new(1, 31, 2);
        assert_eq!(
            kubernetes_binary_url(&version, "kubelet", "amd64"),
            "https://dl.k8s.io/release/v1.31.2/bin/linux/amd64/kubelet"
        );
    }
}
