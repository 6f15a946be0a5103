// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AWS control plane access
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** SDK configuration from on-disk credential material,
//!   `DescribeCluster` and `DeregisterManagedInstance`
//!
//! SDK configs built here never fall back to the default provider chain:
//! credentials come from the profile files the strategy wrote, so a node
//! that happens to run on EC2 cannot silently pick up instance credentials.

use async_trait::async_trait;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_eks::error::ProvideErrorMetadata;
use aws_sdk_eks::operation::describe_cluster::DescribeClusterError;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::cluster::{ClusterDescriber, ClusterDetails, ClusterLookupError, ClusterStatus};
use crate::domain::network::{Ipv4Cidr, RemoteNetworkConfig};
use crate::domain::registration::ManagedInstanceDeregistrar;

const ACCESS_DENIED: &str = "AccessDeniedException";

/// Where an SDK config takes its credentials from.
#[derive(Debug, Clone)]
pub struct ProfileSource<'a> {
    pub region: &'a str,
    pub profile: &'a str,
    pub config_file: Option<&'a Path>,
    pub credentials_file: Option<&'a Path>,
}

/// Build an SDK config whose only credential source is the given profile files.
pub async fn load_profile_config(source: &ProfileSource<'_>) -> SdkConfig {
    let mut files = ProfileFiles::builder();
    if let Some(config) = source.config_file {
        files = files.with_file(ProfileFileKind::Config, config);
    }
    if let Some(credentials) = source.credentials_file {
        files = files.with_file(ProfileFileKind::Credentials, credentials);
    }
    let files = files.build();

    let credentials = ProfileFileCredentialsProvider::builder()
        .profile_files(files.clone())
        .profile_name(source.profile)
        .build();

    debug!(
        region = %source.region,
        profile = %source.profile,
        config_file = ?source.config_file,
        credentials_file = ?source.credentials_file,
        "Loading AWS SDK config from profile files"
    );

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(source.region.to_string()))
        .profile_files(files)
        .profile_name(source.profile)
        .credentials_provider(credentials)
        .load()
        .await
}

pub struct EksClusterDescriber {
    client: aws_sdk_eks::Client,
}

impl EksClusterDescriber {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_eks::Client::new(config),
        }
    }
}

fn parse_cidrs<'a>(raw: impl Iterator<Item = &'a String>, cluster: &str) -> Result<Vec<Ipv4Cidr>, ClusterLookupError> {
    raw.map(|c| {
        c.parse::<Ipv4Cidr>().map_err(|e| ClusterLookupError::Api {
            cluster: cluster.to_string(),
            source: e.into(),
        })
    })
    .collect()
}

#[async_trait]
impl ClusterDescriber for EksClusterDescriber {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDetails, ClusterLookupError> {
        let response = self
            .client
            .describe_cluster()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.code() == Some(ACCESS_DENIED) {
                    return ClusterLookupError::AccessDenied {
                        cluster: name.to_string(),
                        message: service.message().unwrap_or_default().to_string(),
                    };
                }
                match service {
                    DescribeClusterError::ResourceNotFoundException(_) => ClusterLookupError::NotFound {
                        cluster: name.to_string(),
                    },
                    other => ClusterLookupError::Api {
                        cluster: name.to_string(),
                        source: other.into(),
                    },
                }
            })?;

        let cluster = response.cluster().ok_or_else(|| ClusterLookupError::NotFound {
            cluster: name.to_string(),
        })?;

        let remote_network = match cluster.remote_network_config() {
            Some(remote) => {
                let node_cidrs = remote.remote_node_networks().iter().flat_map(|n| n.cidrs().iter());
                let pod_cidrs = remote.remote_pod_networks().iter().flat_map(|n| n.cidrs().iter());
                Some(RemoteNetworkConfig {
                    remote_node_networks: parse_cidrs(node_cidrs, name)?,
                    remote_pod_networks: parse_cidrs(pod_cidrs, name)?,
                })
            }
            None => None,
        };

        let details = ClusterDetails {
            name: cluster.name().unwrap_or(name).to_string(),
            endpoint: cluster.endpoint().map(str::to_string),
            certificate_authority: cluster
                .certificate_authority()
                .and_then(|ca| ca.data())
                .map(str::to_string),
            service_cidr: cluster
                .kubernetes_network_config()
                .and_then(|n| n.service_ipv4_cidr())
                .map(str::to_string),
            status: cluster
                .status()
                .map(|s| ClusterStatus::parse(s.as_str()))
                .unwrap_or_else(|| ClusterStatus::Unknown(String::new())),
            version: cluster.version().map(str::to_string),
            remote_network,
        };
        info!(cluster = %details.name, status = %details.status, "Described cluster");
        Ok(details)
    }
}

pub struct SsmDeregistrar {
    client: aws_sdk_ssm::Client,
}

impl SsmDeregistrar {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl ManagedInstanceDeregistrar for SsmDeregistrar {
    async fn deregister(&self, managed_instance_id: &str) -> anyhow::Result<()> {
        self.client
            .deregister_managed_instance()
            .instance_id(managed_instance_id)
            .send()
            .await
            .map_err(|e| anyhow::Error::new(e.into_service_error()))?;
        info!(instance_id = %managed_instance_id, "Deregistered managed instance");
        Ok(())
    }
}
