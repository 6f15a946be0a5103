// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! kubelet
//!
//! Writes three files: the unit, the `KubeletConfiguration` document (a base
//! document with the operator's `spec.kubelet.config` deep-merged over it)
//! and a kubeconfig that authenticates through `aws-iam-authenticator`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::domain::credentials::CredentialStrategy;
use crate::domain::daemon::{Daemon, DaemonError};
use crate::domain::network::Ipv4Cidr;
use crate::domain::node_config::NodeConfig;
use crate::domain::node_identity::NodeIdentity;
use crate::domain::service::ServiceManager;
use crate::infrastructure::layout::{
    HostLayout, CLUSTER_CA_PATH, KUBECONFIG_PATH, KUBELET_CONFIG_PATH, SIGNING_HELPER_CREDENTIALS_PATH,
    SSM_CREDENTIALS_PATH,
};
use crate::infrastructure::templates::{TemplateEngine, KUBECONFIG_TEMPLATE, KUBELET_UNIT_TEMPLATE};

use super::{enable_and_restart, remove_file, stop_if_running, write_file, disable_if_loaded};

pub const KUBELET_UNIT: &str = "kubelet";
pub const AWS_IAM_AUTHENTICATOR_PATH: &str = "/usr/local/bin/aws-iam-authenticator";
pub const AWS_PROFILE_NAME: &str = "hybrid";

const NAME: &str = "kubelet";

pub struct KubeletDaemon {
    layout: HostLayout,
    services: Arc<dyn ServiceManager>,
    config: NodeConfig,
    identity: NodeIdentity,
    templates: TemplateEngine,
}

impl KubeletDaemon {
    pub fn new(
        layout: HostLayout,
        services: Arc<dyn ServiceManager>,
        config: NodeConfig,
        identity: NodeIdentity,
    ) -> Self {
        Self {
            layout,
            services,
            config,
            identity,
            templates: TemplateEngine::new(),
        }
    }

    fn misconfigured(message: impl Into<String>) -> DaemonError {
        DaemonError::Configuration {
            daemon: NAME.to_string(),
            message: message.into(),
        }
    }

    /// The generated `KubeletConfiguration`, before user overrides.
    pub fn base_config(&self) -> Result<Value, DaemonError> {
        let cluster = &self.config.spec.cluster;
        let mut doc = json!({
            "apiVersion": "kubelet.config.k8s.io/v1beta1",
            "kind": "KubeletConfiguration",
            "address": "0.0.0.0",
            "authentication": {
                "anonymous": { "enabled": false },
                "webhook": { "cacheTTL": "2m0s", "enabled": true },
                "x509": { "clientCAFile": CLUSTER_CA_PATH }
            },
            "authorization": {
                "mode": "Webhook",
                "webhook": { "cacheAuthorizedTTL": "5m0s", "cacheUnauthorizedTTL": "30s" }
            },
            "cgroupDriver": "systemd",
            "clusterDomain": "cluster.local",
            "containerRuntimeEndpoint": "unix:///run/containerd/containerd.sock",
            "featureGates": { "RotateKubeletServerCertificate": true },
            "hairpinMode": "hairpin-veth",
            "protectKernelDefaults": true,
            "providerID": format!(
                "eks-hybrid:///{}/{}/{}",
                cluster.region, cluster.name, self.identity.node_name
            ),
            "readOnlyPort": 0,
            "serializeImagePulls": false,
            "serverTLSBootstrap": true
        });

        if let Some(cidr) = &cluster.cidr {
            let cidr: Ipv4Cidr = cidr
                .parse()
                .map_err(|e: crate::domain::network::CidrParseError| Self::misconfigured(e.to_string()))?;
            doc["clusterDNS"] = json!([cluster_dns_ip(&cidr).to_string()]);
        }
        Ok(doc)
    }

    pub fn render_config(&self) -> Result<Vec<u8>, DaemonError> {
        let mut doc = self.base_config()?;
        merge_json(&mut doc, &Value::Object(self.config.spec.kubelet.config.clone()));
        let mut bytes = serde_json::to_vec_pretty(&doc).map_err(|e| Self::misconfigured(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// kubelet command line, in a stable order.
    pub fn args(&self) -> Vec<String> {
        let kubelet = &self.config.spec.kubelet;
        let mut args = vec![
            format!("--config={}", KUBELET_CONFIG_PATH),
            format!("--kubeconfig={}", KUBECONFIG_PATH),
            format!("--hostname-override={}", self.identity.node_name),
        ];
        if kubelet.node_ip_flag().is_none() {
            if let Some(ip) = self.identity.node_ip {
                args.push(format!("--node-ip={}", ip));
            }
        }
        args.extend(kubelet.flags.iter().cloned());
        args
    }

    fn environment(&self) -> Result<Vec<String>, DaemonError> {
        match self.identity.strategy {
            CredentialStrategy::Ssm => Ok(vec![format!(
                "AWS_SHARED_CREDENTIALS_FILE={}",
                SSM_CREDENTIALS_PATH
            )]),
            CredentialStrategy::IamRolesAnywhere => {
                let iam = self
                    .config
                    .spec
                    .hybrid
                    .as_ref()
                    .and_then(|h| h.iam_roles_anywhere.as_ref())
                    .ok_or_else(|| Self::misconfigured("IAM Roles Anywhere settings are missing"))?;
                let mut environment = vec![
                    format!("AWS_CONFIG_FILE={}", iam.aws_config_path),
                    format!("AWS_PROFILE={}", AWS_PROFILE_NAME),
                ];
                if self.config.credentials_file_enabled() {
                    environment.push(format!(
                        "AWS_SHARED_CREDENTIALS_FILE={}",
                        SIGNING_HELPER_CREDENTIALS_PATH
                    ));
                }
                Ok(environment)
            }
        }
    }

    pub fn render_unit(&self) -> Result<String, DaemonError> {
        let environment = self
            .environment()?
            .iter()
            .map(|e| format!("Environment=\"{}\"", e))
            .collect::<Vec<_>>()
            .join("\n");
        self.templates
            .render(
                KUBELET_UNIT_TEMPLATE,
                &json!({ "environment": environment, "args": self.args().join(" ") }),
            )
            .map_err(|e| Self::misconfigured(e.to_string()))
    }

    pub fn render_kubeconfig(&self) -> Result<String, DaemonError> {
        let cluster = &self.config.spec.cluster;
        let endpoint = cluster
            .api_server_endpoint
            .as_deref()
            .ok_or_else(|| Self::misconfigured("cluster API server endpoint is unknown"))?;
        self.templates
            .render(
                KUBECONFIG_TEMPLATE,
                &json!({
                    "ca_path": CLUSTER_CA_PATH,
                    "endpoint": endpoint,
                    "authenticator": AWS_IAM_AUTHENTICATOR_PATH,
                    "cluster_name": cluster.name,
                    "region": cluster.region,
                }),
            )
            .map_err(|e| Self::misconfigured(e.to_string()))
    }
}

/// By convention the cluster DNS service takes the tenth address of the
/// service CIDR.
pub fn cluster_dns_ip(service_cidr: &Ipv4Cidr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(service_cidr.network()).wrapping_add(10))
}

/// Recursively merge `overlay` into `base`. Objects merge key by key, every
/// other value in `overlay` replaces the one in `base`.
pub fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[async_trait]
impl Daemon for KubeletDaemon {
    fn name(&self) -> &str {
        NAME
    }

    async fn configure(&self) -> Result<(), DaemonError> {
        let unit = self.render_unit()?;
        let config = self.render_config()?;
        let kubeconfig = self.render_kubeconfig()?;

        write_file(NAME, &self.layout.unit_file(KUBELET_UNIT), unit.as_bytes(), None).await?;
        write_file(NAME, &self.layout.kubelet_config(), &config, None).await?;
        write_file(NAME, &self.layout.kubeconfig(), kubeconfig.as_bytes(), None).await?;
        Ok(())
    }

    async fn ensure_running(&self) -> Result<(), DaemonError> {
        enable_and_restart(self.services.as_ref(), KUBELET_UNIT).await
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        stop_if_running(self.services.as_ref(), KUBELET_UNIT).await
    }

    async fn remove(&self) -> Result<(), DaemonError> {
        disable_if_loaded(self.services.as_ref(), KUBELET_UNIT).await?;
        remove_file(NAME, &self.layout.unit_file(KUBELET_UNIT)).await?;
        remove_file(NAME, &self.layout.kubelet_config()).await?;
        remove_file(NAME, &self.layout.kubeconfig()).await?;
        Ok(())
    }
}
