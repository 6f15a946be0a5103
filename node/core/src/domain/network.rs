// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Node Network Rules
//!
//! Pure rules the node IP validation is built from: CIDR parsing and
//! containment against the cluster's remote node networks, the address
//! classes a node IP may never be, and the accepted interface MTU ranges.
//!
//! # Architecture
//!
//! - **Layer:** Domain
//! - **Purpose:** Decide whether a resolved node IP is acceptable to the
//!   control plane. All host inspection happens in
//!   `infrastructure::host_network`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Conventional Ethernet MTU range.
pub const ETHERNET_MTU: RangeInclusive<i64> = 68..=1500;

/// Jumbo-frame MTU range.
pub const JUMBO_FRAME_MTU: RangeInclusive<i64> = 8000..=9001;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid CIDR '{cidr}': {reason}")]
pub struct CidrParseError {
    pub cidr: String,
    pub reason: &'static str,
}

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, CidrParseError> {
        if prefix > 32 {
            return Err(CidrParseError {
                cidr: format!("{}/{}", addr, prefix),
                reason: "prefix length must be between 0 and 32",
            });
        }
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask(prefix));
        Ok(Self { network, prefix })
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & Self::mask(self.prefix) == u32::from(self.network)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (addr, prefix) = trimmed.split_once('/').ok_or_else(|| CidrParseError {
            cidr: s.to_string(),
            reason: "missing '/<prefix>'",
        })?;
        let addr = addr.parse::<Ipv4Addr>().map_err(|_| CidrParseError {
            cidr: s.to_string(),
            reason: "network address is not IPv4",
        })?;
        let prefix = prefix.parse::<u8>().map_err(|_| CidrParseError {
            cidr: s.to_string(),
            reason: "prefix length is not a number",
        })?;
        Self::new(addr, prefix).map_err(|e| CidrParseError {
            cidr: s.to_string(),
            reason: e.reason,
        })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Cluster-declared CIDR blocks for hybrid nodes and their pods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNetworkConfig {
    #[serde(default)]
    pub remote_node_networks: Vec<Ipv4Cidr>,
    #[serde(default)]
    pub remote_pod_networks: Vec<Ipv4Cidr>,
}

impl RemoteNetworkConfig {
    /// Every node CIDR rendered for operator messages, e.g. `[10.0.0.0/24]`.
    pub fn node_cidrs_display(&self) -> String {
        let cidrs: Vec<String> = self
            .remote_node_networks
            .iter()
            .map(ToString::to_string)
            .collect();
        format!("[{}]", cidrs.join(", "))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkValidationError {
    #[error("remote node networks are not configured on the cluster")]
    NoRemoteNodeNetworks,

    #[error("node IP {ip} is not in any of the remote node networks {cidrs}")]
    IpOutsideRemoteNetworks { ip: Ipv4Addr, cidrs: String },

    #[error(
        "interface {interface} with node IP {ip} has MTU {mtu}, expected {}-{} or {}-{}",
        ETHERNET_MTU.start(), ETHERNET_MTU.end(), JUMBO_FRAME_MTU.start(), JUMBO_FRAME_MTU.end()
    )]
    InvalidMtu {
        interface: String,
        ip: Ipv4Addr,
        mtu: i64,
    },
}

/// Confirm the node IP sits inside at least one remote node CIDR.
pub fn check_ip_in_remote_networks(
    ip: Ipv4Addr,
    remote: &RemoteNetworkConfig,
) -> Result<(), NetworkValidationError> {
    if remote.remote_node_networks.is_empty() {
        return Err(NetworkValidationError::NoRemoteNodeNetworks);
    }
    if remote.remote_node_networks.iter().any(|cidr| cidr.contains(ip)) {
        return Ok(());
    }
    Err(NetworkValidationError::IpOutsideRemoteNetworks {
        ip,
        cidrs: remote.node_cidrs_display(),
    })
}

pub fn mtu_is_valid(mtu: i64) -> bool {
    ETHERNET_MTU.contains(&mtu) || JUMBO_FRAME_MTU.contains(&mtu)
}

pub fn check_mtu(interface: &str, ip: Ipv4Addr, mtu: i64) -> Result<(), NetworkValidationError> {
    if mtu_is_valid(mtu) {
        Ok(())
    } else {
        Err(NetworkValidationError::InvalidMtu {
            interface: interface.to_string(),
            ip,
            mtu,
        })
    }
}

/// Address classes the control plane never accepts as a node IP.
pub fn is_usable_node_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_multicast()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(_) => false,
    }
}

/// An address assigned to a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub interface: String,
    pub ip: IpAddr,
}

/// Read-only view of the host network stack.
#[async_trait]
pub trait NetworkInspector: Send + Sync {
    async fn resolve_host(&self, name: &str) -> std::io::Result<Vec<IpAddr>>;

    fn interface_addresses(&self) -> std::io::Result<Vec<InterfaceAddress>>;

    fn mtu(&self, interface: &str) -> std::io::Result<i64>;

    /// Source address the kernel picks for outbound traffic, if any route exists.
    async fn default_bind_address(&self) -> std::io::Result<Option<IpAddr>>;
}

/// Name of the interface carrying `ip`.
pub fn interface_for(addresses: &[InterfaceAddress], ip: Ipv4Addr) -> Option<&str> {
    addresses
        .iter()
        .find(|a| a.ip == IpAddr::V4(ip))
        .map(|a| a.interface.as_str())
}
