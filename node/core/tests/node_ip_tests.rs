// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use hybridadm_core::application::node_ip::{resolve_node_ip, NodeIpError, NodeIpSource};
use hybridadm_core::domain::network::{InterfaceAddress, NetworkInspector};
use hybridadm_core::domain::node_config::KubeletSpec;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Default)]
struct StaticNetwork {
    dns: Vec<IpAddr>,
    local: Vec<IpAddr>,
    bind: Option<IpAddr>,
}

#[async_trait]
impl NetworkInspector for StaticNetwork {
    async fn resolve_host(&self, name: &str) -> io::Result<Vec<IpAddr>> {
        if self.dns.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("{} does not resolve", name)));
        }
        Ok(self.dns.clone())
    }

    fn interface_addresses(&self) -> io::Result<Vec<InterfaceAddress>> {
        Ok(self
            .local
            .iter()
            .map(|ip| InterfaceAddress {
                interface: "eth0".to_string(),
                ip: *ip,
            })
            .collect())
    }

    fn mtu(&self, _interface: &str) -> io::Result<i64> {
        Ok(1500)
    }

    async fn default_bind_address(&self) -> io::Result<Option<IpAddr>> {
        Ok(self.bind)
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn kubelet(flags: &[&str]) -> KubeletSpec {
    KubeletSpec {
        flags: flags.iter().map(|f| f.to_string()).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_kubelet_flag_wins_over_everything() {
    let network = StaticNetwork {
        dns: vec![ip("10.0.0.7")],
        local: vec![ip("10.0.0.7")],
        bind: Some(ip("10.0.0.9")),
    };
    let resolved = resolve_node_ip(&kubelet(&["--node-ip=10.0.0.5"]), "node-a", &network)
        .await
        .unwrap();
    assert_eq!(resolved, (Ipv4Addr::new(10, 0, 0, 5), NodeIpSource::KubeletFlag));
}

#[tokio::test]
async fn test_dns_used_when_it_points_at_a_local_address() {
    let network = StaticNetwork {
        dns: vec![ip("10.0.0.7")],
        local: vec![ip("10.0.0.7")],
        bind: Some(ip("10.0.0.9")),
    };
    let resolved = resolve_node_ip(&kubelet(&[]), "node-a", &network).await.unwrap();
    assert_eq!(resolved, (Ipv4Addr::new(10, 0, 0, 7), NodeIpSource::Dns));
}

#[tokio::test]
async fn test_dns_pointing_elsewhere_falls_back_to_default_route() {
    let network = StaticNetwork {
        dns: vec![ip("203.0.113.10")],
        local: vec![ip("10.0.0.9")],
        bind: Some(ip("10.0.0.9")),
    };
    let resolved = resolve_node_ip(&kubelet(&[]), "node-a", &network).await.unwrap();
    assert_eq!(resolved, (Ipv4Addr::new(10, 0, 0, 9), NodeIpSource::DefaultRoute));
}

#[tokio::test]
async fn test_no_usable_address_is_an_error() {
    let network = StaticNetwork {
        bind: Some(ip("127.0.0.1")),
        ..Default::default()
    };
    let err = resolve_node_ip(&kubelet(&[]), "node-a", &network).await.unwrap_err();
    assert!(matches!(err, NodeIpError::NotFound));
}

#[tokio::test]
async fn test_ipv6_flag_is_rejected() {
    let err = resolve_node_ip(&kubelet(&["--node-ip", "fd00::5"]), "node-a", &StaticNetwork::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NodeIpError::InvalidFlag { .. }));
}
