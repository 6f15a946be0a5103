// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Node IP against the cluster's remote node networks, plus the MTU of the
//! interface carrying it.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::network::{
    check_ip_in_remote_networks, check_mtu, interface_for, NetworkInspector, NetworkValidationError,
};
use crate::domain::validation::{CheckResult, CheckStatus, Validation, ValidationError};

use super::{NodeContext, NODE_IP_VALIDATION};

const HYBRID_NETWORK_REMEDIATION: &str =
    "Ensure the cluster is configured for hybrid nodes: set remoteNetworkConfig.remoteNodeNetworks on the EKS cluster.";

#[derive(Debug, Error)]
#[error("no local interface carries node IP {0}")]
pub struct InterfaceNotFound(pub std::net::Ipv4Addr);

pub struct NodeIpValidation {
    network: Arc<dyn NetworkInspector>,
}

impl NodeIpValidation {
    pub fn new(network: Arc<dyn NetworkInspector>) -> Self {
        Self { network }
    }
}

#[async_trait]
impl Validation<NodeContext> for NodeIpValidation {
    fn name(&self) -> &str {
        NODE_IP_VALIDATION
    }

    fn description(&self) -> &str {
        "Validating node IP is in the cluster's remote node networks"
    }

    async fn run(&self, ctx: &NodeContext) -> CheckResult {
        let Some(cluster) = &ctx.cluster else {
            return Ok(CheckStatus::skipped(ctx.cluster_skip_reason()));
        };
        let Some(ip) = ctx.identity.node_ip else {
            return Ok(CheckStatus::skipped("node IP has not been resolved"));
        };

        let remote = cluster.remote_network.clone().unwrap_or_default();
        check_ip_in_remote_networks(ip, &remote).map_err(|e| match e {
            NetworkValidationError::NoRemoteNodeNetworks => {
                ValidationError::fatal(e).with_remediation(HYBRID_NETWORK_REMEDIATION)
            }
            other => ValidationError::fatal(other).with_remediation(format!(
                "Ensure the node IP is within one of the remote node networks {}, or pass --node-ip in the kubelet flags.",
                remote.node_cidrs_display()
            )),
        })?;

        if !ctx.config.spec.network.validate_mtu {
            debug!("MTU validation disabled");
            return Ok(CheckStatus::Passed);
        }

        let addresses = self
            .network
            .interface_addresses()
            .map_err(ValidationError::fatal)?;
        let interface = interface_for(&addresses, ip).ok_or_else(|| {
            ValidationError::fatal(InterfaceNotFound(ip)).with_remediation(
                "The node IP must be assigned to a local interface. Check the --node-ip kubelet flag.",
            )
        })?;
        let mtu = self.network.mtu(interface).map_err(ValidationError::fatal)?;
        check_mtu(interface, ip, mtu).map_err(|e| {
            ValidationError::fatal(e).with_remediation(
                "Set the interface MTU to a standard Ethernet (68-1500) or jumbo frame (8000-9001) value, or set spec.network.validateMtu to false.",
            )
        })?;

        Ok(CheckStatus::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::node_ip::fake::FakeNetwork;
    use crate::application::validations::fixtures::context;
    use crate::domain::network::RemoteNetworkConfig;

    fn validation(network: FakeNetwork) -> NodeIpValidation {
        NodeIpValidation::new(Arc::new(network))
    }

    fn eth0(mtu: i64) -> FakeNetwork {
        FakeNetwork::default().with_interface("eth0", "10.0.0.5", mtu)
    }

    #[tokio::test]
    async fn test_skipped_without_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).with_cluster_unavailable("access denied");
        let status = validation(eth0(1500)).run(&ctx).await.unwrap();
        assert!(matches!(status, CheckStatus::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_ip_inside_network_passes() {
        let dir = tempfile::tempdir().unwrap();
        let status = validation(eth0(1500)).run(&context(dir.path())).await.unwrap();
        assert_eq!(status, CheckStatus::Passed);
    }

    #[tokio::test]
    async fn test_no_remote_networks_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.cluster.as_mut().unwrap().remote_network = Some(RemoteNetworkConfig::default());

        let err = validation(eth0(1500)).run(&ctx).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.downcast_ref::<NetworkValidationError>(),
            Some(&NetworkValidationError::NoRemoteNodeNetworks)
        );
        assert!(err.remediation().unwrap().contains("configured for hybrid nodes"));
    }

    #[tokio::test]
    async fn test_ip_outside_networks_names_ip_and_cidrs() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.identity.node_ip = Some("192.168.1.1".parse().unwrap());

        let err = validation(eth0(1500)).run(&ctx).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("192.168.1.1"));
        assert!(message.contains("[10.0.0.0/24]"));
    }

    // ── MTU ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_mtu_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        for mtu in [68, 1500, 8000, 9001] {
            assert!(validation(eth0(mtu)).run(&ctx).await.is_ok(), "{mtu}");
        }
        for mtu in [67, 1501, 7999, 9002] {
            let err = validation(eth0(mtu)).run(&ctx).await.unwrap_err();
            assert!(err.is::<NetworkValidationError>(), "{mtu}");
            assert!(err.to_string().contains("eth0"));
        }
    }

    #[tokio::test]
    async fn test_mtu_check_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.config.spec.network.validate_mtu = false;
        assert!(validation(eth0(9100)).run(&ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_deterministic_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.identity.node_ip = Some("192.168.1.1".parse().unwrap());
        let check = validation(eth0(1500));

        let first = check.run(&ctx).await.unwrap_err();
        let second = check.run(&ctx).await.unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.severity(), second.severity());
    }
}
