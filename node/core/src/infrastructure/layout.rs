// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Filesystem layout of a hybrid node.
//!
//! Every path the agent reads or writes is an absolute host path re-rooted
//! under an install root, so the whole pipeline can run against a scratch
//! directory.

use std::path::{Path, PathBuf};

use crate::domain::registration::REGISTRATION_PATH;

pub const SSM_CREDENTIALS_PATH: &str = "/root/.aws/credentials";
pub const SIGNING_HELPER_CREDENTIALS_PATH: &str = "/eks-hybrid/.aws/credentials";
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const CLUSTER_CA_PATH: &str = "/etc/kubernetes/pki/ca.crt";
pub const KUBELET_CONFIG_PATH: &str = "/etc/kubernetes/kubelet/config.json";
pub const KUBECONFIG_PATH: &str = "/var/lib/kubelet/kubeconfig";
pub const CONTAINERD_CONFIG_PATH: &str = "/etc/containerd/config.toml";
pub const KUBELET_SERVING_CERT_PATH: &str = "/var/lib/kubelet/pki/kubelet-server-current.pem";
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    root: PathBuf,
}

impl HostLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The real machine.
    pub fn host() -> Self {
        Self::new("/")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an absolute host path under the install root.
    pub fn path(&self, host_path: impl AsRef<Path>) -> PathBuf {
        let host_path = host_path.as_ref();
        let relative = host_path.strip_prefix("/").unwrap_or(host_path);
        self.root.join(relative)
    }

    pub fn registration(&self) -> PathBuf {
        self.path(REGISTRATION_PATH)
    }

    pub fn ssm_credentials(&self) -> PathBuf {
        self.path(SSM_CREDENTIALS_PATH)
    }

    pub fn signing_helper_credentials(&self) -> PathBuf {
        self.path(SIGNING_HELPER_CREDENTIALS_PATH)
    }

    pub fn unit_file(&self, unit: &str) -> PathBuf {
        self.path(SYSTEMD_UNIT_DIR).join(format!("{}.service", unit))
    }

    pub fn cluster_ca(&self) -> PathBuf {
        self.path(CLUSTER_CA_PATH)
    }

    pub fn kubelet_config(&self) -> PathBuf {
        self.path(KUBELET_CONFIG_PATH)
    }

    pub fn kubeconfig(&self) -> PathBuf {
        self.path(KUBECONFIG_PATH)
    }

    pub fn containerd_config(&self) -> PathBuf {
        self.path(CONTAINERD_CONFIG_PATH)
    }

    pub fn kubelet_serving_cert(&self) -> PathBuf {
        self.path(KUBELET_SERVING_CERT_PATH)
    }

    pub fn os_release(&self) -> PathBuf {
        self.path(OS_RELEASE_PATH)
    }
}

impl Default for HostLayout {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_layout_is_identity() {
        let layout = HostLayout::host();
        assert_eq!(layout.cluster_ca(), PathBuf::from(CLUSTER_CA_PATH));
        assert_eq!(
            layout.unit_file("kubelet"),
            PathBuf::from("/etc/systemd/system/kubelet.service")
        );
    }

    #[test]
    fn test_reroots_absolute_paths() {
        let layout = HostLayout::new("/tmp/root");
        assert_eq!(
            layout.registration(),
            PathBuf::from("/tmp/root/var/lib/amazon/ssm/registration")
        );
        assert_eq!(
            layout.path("/etc/aws/hybrid/config"),
            PathBuf::from("/tmp/root/etc/aws/hybrid/config")
        );
    }
}
