// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Host network inspection
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Implements `NetworkInspector` with `getifaddrs(3)`, sysfs
//!   and the system resolver

use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;
use tokio::net::UdpSocket;

use crate::domain::network::{InterfaceAddress, NetworkInspector};

const SYS_CLASS_NET: &str = "/sys/class/net";

/// Any public address works: connecting a UDP socket only consults the
/// routing table, no packet leaves the host.
const ROUTE_PROBE: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 53));

pub struct HostNetwork {
    sys_class_net: PathBuf,
}

impl HostNetwork {
    pub fn new() -> Self {
        Self {
            sys_class_net: PathBuf::from(SYS_CLASS_NET),
        }
    }
}

impl Default for HostNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkInspector for HostNetwork {
    async fn resolve_host(&self, name: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((name, 0)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }

    fn interface_addresses(&self) -> io::Result<Vec<InterfaceAddress>> {
        let ifaddrs = nix::ifaddrs::getifaddrs().map_err(io::Error::from)?;
        let mut out = Vec::new();
        for ifaddr in ifaddrs {
            let Some(address) = ifaddr.address else {
                continue;
            };
            let ip = if let Some(sin) = address.as_sockaddr_in() {
                IpAddr::V4(*SocketAddrV4::from(*sin).ip())
            } else if let Some(sin6) = address.as_sockaddr_in6() {
                IpAddr::V6(*SocketAddrV6::from(*sin6).ip())
            } else {
                continue;
            };
            out.push(InterfaceAddress {
                interface: ifaddr.interface_name,
                ip,
            });
        }
        Ok(out)
    }

    fn mtu(&self, interface: &str) -> io::Result<i64> {
        let raw = std::fs::read_to_string(self.sys_class_net.join(interface).join("mtu"))?;
        raw.trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("mtu of {interface}: {e}")))
    }

    async fn default_bind_address(&self) -> io::Result<Option<IpAddr>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        match socket.connect(ROUTE_PROBE).await {
            Ok(()) => Ok(Some(socket.local_addr()?.ip())),
            // No default route.
            Err(e) if e.kind() == io::ErrorKind::NetworkUnreachable => Ok(None),
            Err(e) => Err(e),
        }
    }
}
