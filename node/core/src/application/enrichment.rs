// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cluster enrichment
//!
//! Fills in the cluster fields the operator left out of the node
//! configuration from `DescribeCluster`. Fields that are already set are never
//! overwritten, and nothing is called when nothing is missing.

use thiserror::Error;
use tracing::info;

use crate::domain::cluster::{ClusterDescriber, ClusterDetails, ClusterLookupError, ClusterStatus};
use crate::domain::node_config::{ClusterSpec, NodeConfig};

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Lookup(#[from] ClusterLookupError),

    #[error("cluster {cluster} is {status}, it must be ACTIVE")]
    NotActive { cluster: String, status: ClusterStatus },

    #[error("cluster {cluster} has no remote network configuration; configure the cluster for hybrid nodes")]
    NotHybrid { cluster: String },

    #[error("cluster {cluster} did not report its {field}")]
    MissingField { cluster: String, field: &'static str },
}

pub fn needs_enrichment(cluster: &ClusterSpec) -> bool {
    cluster.api_server_endpoint.is_none()
        || cluster.certificate_authority.is_none()
        || cluster.cidr.is_none()
}

/// Complete `config.spec.cluster` from the control plane.
///
/// Returns the cluster details when a describe call was made.
pub async fn enrich(
    config: &mut NodeConfig,
    describer: &dyn ClusterDescriber,
) -> Result<Option<ClusterDetails>, EnrichmentError> {
    if !needs_enrichment(&config.spec.cluster) {
        return Ok(None);
    }

    let name = config.spec.cluster.name.clone();
    info!(cluster = %name, "Enriching node configuration from DescribeCluster");
    let details = describer.describe_cluster(&name).await?;

    if details.status != ClusterStatus::Active {
        return Err(EnrichmentError::NotActive {
            cluster: name,
            status: details.status,
        });
    }
    if details.remote_network.is_none() {
        return Err(EnrichmentError::NotHybrid { cluster: name });
    }

    let cluster = &mut config.spec.cluster;
    fill(&mut cluster.api_server_endpoint, &details.endpoint, &name, "API server endpoint")?;
    fill(
        &mut cluster.certificate_authority,
        &details.certificate_authority,
        &name,
        "certificate authority",
    )?;
    fill(&mut cluster.cidr, &details.service_cidr, &name, "service CIDR")?;

    Ok(Some(details))
}

fn fill(
    target: &mut Option<String>,
    source: &Option<String>,
    cluster: &str,
    field: &'static str,
) -> Result<(), EnrichmentError> {
    if target.is_some() {
        return Ok(());
    }
    match source {
        Some(value) => {
            *target = Some(value.clone());
            Ok(())
        }
        None => Err(EnrichmentError::MissingField {
            cluster: cluster.to_string(),
            field,
        }),
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{active_cluster, FakeDescriber};
    use super::*;
    use crate::domain::node_config::fixtures::ssm_config;

    #[tokio::test]
    async fn test_fills_only_missing_fields() {
        let mut config = ssm_config();
        config.spec.cluster.cidr = Some("10.100.0.0/16".to_string());
        let describer = FakeDescriber::returning(active_cluster());

        let details = enrich(&mut config, &describer).await.unwrap();
        assert!(details.is_some());
        let cluster = &config.spec.cluster;
        assert_eq!(
            cluster.api_server_endpoint.as_deref(),
            Some("https://ABCDEF.gr7.us-west-2.eks.amazonaws.com")
        );
        assert_eq!(cluster.certificate_authority.as_deref(), Some("Y2EtZGF0YQ=="));
        assert_eq!(cluster.cidr.as_deref(), Some("10.100.0.0/16"));
    }

    #[tokio::test]
    async fn test_idempotent_without_describe_call() {
        let mut config = ssm_config();
        let describer = FakeDescriber::returning(active_cluster());
        enrich(&mut config, &describer).await.unwrap();
        let once = config.clone();

        assert!(enrich(&mut config, &describer).await.unwrap().is_none());
        assert_eq!(config, once);
        assert_eq!(describer.calls(), 1);
    }

    #[tokio::test]
    async fn test_inactive_cluster_rejected() {
        let mut details = active_cluster();
        details.status = ClusterStatus::Creating;
        let err = enrich(&mut ssm_config(), &FakeDescriber::returning(details))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichmentError::NotActive { .. }));
        assert!(err.to_string().contains("CREATING"));
    }

    #[tokio::test]
    async fn test_non_hybrid_cluster_rejected() {
        let mut details = active_cluster();
        details.remote_network = None;
        let err = enrich(&mut ssm_config(), &FakeDescriber::returning(details))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichmentError::NotHybrid { .. }));
    }

    #[tokio::test]
    async fn test_access_denied_is_distinguishable() {
        let describer = FakeDescriber::failing(|name| ClusterLookupError::AccessDenied {
            cluster: name.to_string(),
            message: "not authorized".to_string(),
        });
        let err = enrich(&mut ssm_config(), &describer).await.unwrap_err();
        match err {
            EnrichmentError::Lookup(lookup) => assert!(lookup.is_access_denied()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
