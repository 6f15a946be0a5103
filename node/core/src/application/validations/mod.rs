// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Node Validations
//!
//! The registry of checks run after bootstrap and by `debug`.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Concrete [`Validation`]s over a frozen [`NodeContext`]
//!
//! | Name | Severity on failure |
//! |------|---------------------|
//! | `node-ip-validation` | fatal |
//! | `kubelet-cert-validation` | fatal |
//! | `ntp-validation` | warning |
//! | `kubernetes-version-skew-validation` | fatal |
//! | `api-server-endpoint-access-validation` | fatal |
//! | `previous-install-validation` | warning |
//!
//! Host access (network stack, processes, systemd) is injected through each
//! check's constructor; the context only carries data.

pub mod endpoint_access;
pub mod kubelet_cert;
pub mod node_ip;
pub mod ntp;
pub mod previous_install;
pub mod version_skew;

pub use endpoint_access::EndpointAccessValidation;
pub use kubelet_cert::KubeletCertValidation;
pub use node_ip::NodeIpValidation;
pub use ntp::NtpValidation;
pub use previous_install::{InstallPhase, PreviousInstallValidation};
pub use version_skew::VersionSkewValidation;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::cluster::ClusterDetails;
use crate::domain::network::NetworkInspector;
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::NodeIdentity;
use crate::domain::service::ServiceManager;
use crate::domain::validation::Validation;
use crate::infrastructure::command::CommandRunner;
use crate::infrastructure::layout::HostLayout;

pub const NODE_IP_VALIDATION: &str = "node-ip-validation";
pub const KUBELET_CERT_VALIDATION: &str = "kubelet-cert-validation";
pub const NTP_VALIDATION: &str = "ntp-validation";
pub const VERSION_SKEW_VALIDATION: &str = "kubernetes-version-skew-validation";
pub const ENDPOINT_ACCESS_VALIDATION: &str = "api-server-endpoint-access-validation";
pub const PREVIOUS_INSTALL_VALIDATION: &str = "previous-install-validation";

/// Everything a validation may look at. Built once, after the node identity
/// has been frozen.
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// Enriched node configuration
    pub config: NodeConfig,
    pub identity: NodeIdentity,
    /// `None` when DescribeCluster was not called or failed
    pub cluster: Option<ClusterDetails>,
    /// Why `cluster` is missing, shown when dependent checks skip
    pub cluster_unavailable_reason: Option<String>,
    pub layout: HostLayout,
    pub now: DateTime<Utc>,
}

impl NodeContext {
    pub fn new(config: NodeConfig, identity: NodeIdentity, layout: HostLayout) -> Self {
        Self {
            config,
            identity,
            cluster: None,
            cluster_unavailable_reason: None,
            layout,
            now: Utc::now(),
        }
    }

    pub fn with_cluster(mut self, cluster: Option<ClusterDetails>) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_cluster_unavailable(mut self, reason: impl Into<String>) -> Self {
        self.cluster = None;
        self.cluster_unavailable_reason = Some(reason.into());
        self
    }

    /// Skip reason for checks that need the cluster object.
    pub fn cluster_skip_reason(&self) -> String {
        match &self.cluster_unavailable_reason {
            Some(reason) => format!("cluster details unavailable: {}", reason),
            None => "cluster details unavailable".to_string(),
        }
    }
}

/// Host access shared by the registry.
#[derive(Clone)]
pub struct ValidationDeps {
    pub network: Arc<dyn NetworkInspector>,
    pub runner: Arc<dyn CommandRunner>,
    pub services: Arc<dyn ServiceManager>,
}

pub type Registry = Vec<Box<dyn Validation<NodeContext>>>;

/// Checks that must pass before `init` touches the host.
pub fn preflight(deps: &ValidationDeps) -> Registry {
    vec![Box::new(PreviousInstallValidation::new(
        deps.services.clone(),
        InstallPhase::Bootstrap,
    ))]
}

/// Checks run before `uninstall` stops anything.
pub fn uninstall_readiness(deps: &ValidationDeps) -> Registry {
    vec![Box::new(PreviousInstallValidation::new(
        deps.services.clone(),
        InstallPhase::Removal,
    ))]
}

/// Checks run once the node is bootstrapped.
pub fn post_init(deps: &ValidationDeps) -> Registry {
    vec![
        Box::new(NodeIpValidation::new(deps.network.clone())),
        Box::new(KubeletCertValidation),
        Box::new(NtpValidation::new(deps.runner.clone())),
        Box::new(VersionSkewValidation::new(deps.runner.clone())),
        Box::new(EndpointAccessValidation::new()),
    ]
}

/// Every check, in the order `debug` reports them.
pub fn full(deps: &ValidationDeps) -> Registry {
    let mut registry = post_init(deps);
    registry.extend(preflight(deps));
    registry
}
