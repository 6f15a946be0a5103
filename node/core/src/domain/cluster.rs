// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Cluster Control Plane View
//!
//! What the agent needs to know about the EKS cluster it joins, as returned by
//! `DescribeCluster`, and the seam through which it is fetched.
//!
//! # Architecture
//!
//! - **Layer:** Domain
//! - **Purpose:** Decouple enrichment and validations from the AWS SDK. The
//!   production implementation is `infrastructure::aws::EksClusterDescriber`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::network::RemoteNetworkConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Creating,
    Active,
    Deleting,
    Failed,
    Updating,
    Pending,
    Unknown(String),
}

impl ClusterStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            "DELETING" => Self::Deleting,
            "FAILED" => Self::Failed,
            "UPDATING" => Self::Updating,
            "PENDING" => Self::Pending,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "CREATING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Deleting => write!(f, "DELETING"),
            Self::Failed => write!(f, "FAILED"),
            Self::Updating => write!(f, "UPDATING"),
            Self::Pending => write!(f, "PENDING"),
            Self::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Projection of a `DescribeCluster` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDetails {
    pub name: String,
    pub endpoint: Option<String>,
    /// Base64 PEM, exactly as the API returns it
    pub certificate_authority: Option<String>,
    pub service_cidr: Option<String>,
    pub status: ClusterStatus,
    /// Control plane Kubernetes version, e.g. "1.31"
    pub version: Option<String>,
    /// `None` when the cluster was not created for hybrid nodes
    pub remote_network: Option<RemoteNetworkConfig>,
}

#[derive(Debug, Error)]
pub enum ClusterLookupError {
    #[error("not authorized to describe cluster {cluster}: {message}")]
    AccessDenied { cluster: String, message: String },

    #[error("cluster {cluster} not found")]
    NotFound { cluster: String },

    #[error("failed to describe cluster {cluster}: {source}")]
    Api {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ClusterLookupError {
    /// The dependency, not the node, is at fault: checks relying on the
    /// cluster object degrade to "skipped".
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

#[async_trait]
pub trait ClusterDescriber: Send + Sync {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDetails, ClusterLookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for raw in ["CREATING", "ACTIVE", "DELETING", "FAILED", "UPDATING", "PENDING"] {
            assert_eq!(ClusterStatus::parse(raw).to_string(), raw);
        }
        assert_eq!(
            ClusterStatus::parse("SOMETHING_NEW"),
            ClusterStatus::Unknown("SOMETHING_NEW".to_string())
        );
    }
}
