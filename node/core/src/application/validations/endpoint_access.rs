// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! API server reachability.
//!
//! Only the TLS handshake against the cluster CA matters: any HTTP response,
//! including 401/403, proves the endpoint is reachable.

use async_trait::async_trait;
use reqwest::{Certificate, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::validation::{CheckResult, CheckStatus, Validation, ValidationError};

use super::{NodeContext, ENDPOINT_ACCESS_VALIDATION};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EndpointAccessError {
    #[error("cluster certificate authority is not a usable PEM bundle: {0}")]
    CertificateAuthority(#[source] reqwest::Error),

    #[error("cluster certificate authority contains no certificates")]
    EmptyCertificateAuthority,

    #[error("failed to build HTTPS client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("could not reach API server {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

pub struct EndpointAccessValidation {
    timeout: Duration,
}

impl EndpointAccessValidation {
    pub fn new() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
        }
    }

    fn client(&self, ca_pem: &[u8]) -> Result<Client, EndpointAccessError> {
        let certs = Certificate::from_pem_bundle(ca_pem).map_err(EndpointAccessError::CertificateAuthority)?;
        if certs.is_empty() {
            return Err(EndpointAccessError::EmptyCertificateAuthority);
        }
        let mut builder = Client::builder()
            .tls_certs_only(std::iter::empty())
            .timeout(self.timeout);
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
        builder.build().map_err(EndpointAccessError::Client)
    }
}

impl Default for EndpointAccessValidation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validation<NodeContext> for EndpointAccessValidation {
    fn name(&self) -> &str {
        ENDPOINT_ACCESS_VALIDATION
    }

    fn description(&self) -> &str {
        "Validating access to the Kubernetes API server endpoint"
    }

    async fn run(&self, ctx: &NodeContext) -> CheckResult {
        let cluster = &ctx.config.spec.cluster;
        let Some(endpoint) = cluster.api_server_endpoint.as_deref() else {
            return Ok(CheckStatus::skipped("API server endpoint unknown"));
        };
        let ca = match cluster.certificate_authority_pem() {
            Ok(Some(ca)) => ca,
            Ok(None) => return Ok(CheckStatus::skipped("cluster certificate authority unknown")),
            Err(e) => return Err(ValidationError::fatal(e)),
        };

        let client = self.client(&ca).map_err(ValidationError::fatal)?;
        match client.get(endpoint).send().await {
            Ok(response) => {
                debug!(endpoint = %endpoint, status = %response.status(), "API server answered");
                Ok(CheckStatus::Passed)
            }
            Err(source) => Err(ValidationError::fatal(EndpointAccessError::Unreachable {
                endpoint: endpoint.to_string(),
                source,
            })
            .with_remediation(format!(
                "Ensure the node can reach {} on port 443: check routes, firewalls and proxies between the node and the cluster's VPC.",
                endpoint
            ))),
        }
    }
}
