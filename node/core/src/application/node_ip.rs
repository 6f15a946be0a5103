// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Node IP resolution
//!
//! First match wins:
//!
//! 1. kubelet `--node-ip` flag
//! 2. DNS for the node name, restricted to addresses bound on this host
//! 3. the source address of the default route

use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::network::{is_usable_node_ip, NetworkInspector};
use crate::domain::node_config::KubeletSpec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeIpError {
    #[error("invalid --node-ip '{value}': {reason}")]
    InvalidFlag { value: String, reason: String },

    #[error("couldn't get ip address of node")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIpSource {
    KubeletFlag,
    Dns,
    DefaultRoute,
}

impl fmt::Display for NodeIpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KubeletFlag => write!(f, "kubelet --node-ip flag"),
            Self::Dns => write!(f, "DNS"),
            Self::DefaultRoute => write!(f, "default route"),
        }
    }
}

fn parse_flag(value: &str) -> Result<Ipv4Addr, NodeIpError> {
    let invalid = |reason: &str| NodeIpError::InvalidFlag {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    match value.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_unspecified() => Err(invalid("address is unspecified")),
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(_)) => Err(invalid("only IPv4 node addresses are supported")),
        Err(_) => Err(invalid("not an IP address")),
    }
}

pub async fn resolve_node_ip(
    kubelet: &KubeletSpec,
    node_name: &str,
    network: &dyn NetworkInspector,
) -> Result<(Ipv4Addr, NodeIpSource), NodeIpError> {
    if let Some(value) = kubelet.node_ip_flag() {
        let ip = parse_flag(value)?;
        info!(node_ip = %ip, "Using node IP from kubelet flags");
        return Ok((ip, NodeIpSource::KubeletFlag));
    }

    if let Some(ip) = resolve_via_dns(node_name, network).await {
        info!(node_ip = %ip, node_name = %node_name, "Using node IP from DNS");
        return Ok((ip, NodeIpSource::Dns));
    }

    match network.default_bind_address().await {
        Ok(Some(IpAddr::V4(ip))) if is_usable_node_ip(&IpAddr::V4(ip)) => {
            info!(node_ip = %ip, "Using node IP from the default route");
            return Ok((ip, NodeIpSource::DefaultRoute));
        }
        Ok(other) => debug!(address = ?other, "Default route gives no usable IPv4 address"),
        Err(e) => debug!(error = %e, "Could not determine default route address"),
    }

    Err(NodeIpError::NotFound)
}

async fn resolve_via_dns(node_name: &str, network: &dyn NetworkInspector) -> Option<Ipv4Addr> {
    let resolved = match network.resolve_host(node_name).await {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!(node_name = %node_name, error = %e, "Node name does not resolve");
            return None;
        }
    };
    let local: HashSet<IpAddr> = match network.interface_addresses() {
        Ok(addrs) => addrs.into_iter().map(|a| a.ip).collect(),
        Err(e) => {
            debug!(error = %e, "Could not list interface addresses");
            return None;
        }
    };

    resolved.into_iter().find_map(|ip| match ip {
        IpAddr::V4(v4) if is_usable_node_ip(&ip) && local.contains(&ip) => Some(v4),
        _ => None,
    })
}


#[cfg(test)]
mod tests {
    use super::fake::FakeNetwork;
    use super::*;

    fn flags(flags: &[&str]) -> KubeletSpec {
        KubeletSpec {
            config: Default::default(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn network() -> FakeNetwork {
        FakeNetwork::default()
            .with_interface("lo", "127.0.0.1", 65536)
            .with_interface("eth0", "10.0.0.5", 1500)
            .with_dns("node-a", &["127.0.0.1", "192.168.9.9", "10.0.0.5"])
            .with_bind_address("10.0.0.99")
    }

    #[tokio::test]
    async fn test_flag_wins() {
        let (ip, source) = resolve_node_ip(&flags(&["--node-ip=10.0.0.7"]), "node-a", &network())
            .await
            .unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(source, NodeIpSource::KubeletFlag);
    }

    #[tokio::test]
    async fn test_bad_flags_are_fatal() {
        for value in ["--node-ip=nonsense", "--node-ip=fd00::1", "--node-ip=0.0.0.0"] {
            let err = resolve_node_ip(&flags(&[value]), "node-a", &network())
                .await
                .unwrap_err();
            assert!(matches!(err, NodeIpError::InvalidFlag { .. }), "{value}");
        }
    }

    #[tokio::test]
    async fn test_dns_takes_first_usable_local_address() {
        let (ip, source) = resolve_node_ip(&flags(&[]), "node-a", &network()).await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(source, NodeIpSource::Dns);
    }

    #[tokio::test]
    async fn test_falls_back_to_default_route() {
        let (ip, source) = resolve_node_ip(&flags(&[]), "unknown-node", &network())
            .await
            .unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 99));
        assert_eq!(source, NodeIpSource::DefaultRoute);
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let network = FakeNetwork::default().with_interface("lo", "127.0.0.1", 65536);
        let err = resolve_node_ip(&flags(&[]), "unknown-node", &network)
            .await
            .unwrap_err();
        assert_eq!(err, NodeIpError::NotFound);
        assert_eq!(err.to_string(), "couldn't get ip address of node");
    }
}
