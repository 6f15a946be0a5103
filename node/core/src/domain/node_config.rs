// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Node Configuration Types
//
// Defines the document an operator hands to `hybridadm`:
// - Kubernetes-style manifest format (apiVersion/kind/spec)
// - Cluster identity (name, region, endpoint, CA, service CIDR)
// - Credential strategy (SSM or IAM Roles Anywhere)
// - kubelet / containerd overrides
// - Timing knobs for registration retries and credential waits

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::network::Ipv4Cidr;
use crate::domain::policy::{PollPolicy, RetryPolicy};

pub const API_VERSION: &str = "node.eks.aws/v1alpha1";
pub const KIND: &str = "NodeConfig";

pub const DEFAULT_AWS_CONFIG_PATH: &str = "/etc/aws/hybrid/config";

/// Longest role session name IAM accepts.
const MAX_NODE_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no node configuration found; pass --config or set HYBRIDADM_CONFIG_PATH")]
    NotFound,

    #[error("failed to read node configuration {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse node configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid apiVersion '{0}', must be '{expected}'", expected = API_VERSION)]
    ApiVersion(String),

    #[error("invalid kind '{0}', must be '{expected}'", expected = KIND)]
    Kind(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("only one of spec.hybrid.ssm or spec.hybrid.iamRolesAnywhere can be set")]
    MultipleCredentialStrategies,

    #[error("either spec.hybrid.ssm or spec.hybrid.iamRolesAnywhere must be set")]
    NoCredentialStrategy,
}

/// Top-level node configuration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// API version (must be "node.eks.aws/v1alpha1")
    pub api_version: String,

    /// Resource kind (must be "NodeConfig")
    pub kind: String,

    pub spec: NodeConfigSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigSpec {
    pub cluster: ClusterSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridSpec>,

    #[serde(default)]
    pub kubelet: KubeletSpec,

    #[serde(default)]
    pub containerd: ContainerdSpec,

    #[serde(default)]
    pub network: NetworkSpec,

    #[serde(default)]
    pub timeouts: TimeoutSpec,
}

/// Cluster identity. Endpoint, CA and CIDR are filled in by enrichment when
/// the operator leaves them out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_endpoint: Option<String>,

    /// Base64 of the PEM encoded cluster CA bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,

    /// Kubernetes service CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
}

impl ClusterSpec {
    /// Decoded PEM bytes of the cluster CA, if present.
    pub fn certificate_authority_pem(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let Some(encoded) = self.certificate_authority.as_deref() else {
            return Ok(None);
        };
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidField {
                field: "spec.cluster.certificateAuthority",
                reason: format!("not valid base64: {}", e),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssm: Option<SsmSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_roles_anywhere: Option<IamRolesAnywhereSpec>,

    /// Run the signing helper in `update` mode so a shared credentials file
    /// is kept fresh for other consumers on the host (IAM Roles Anywhere only).
    #[serde(default)]
    pub enable_credentials_file: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsmSpec {
    #[serde(default)]
    pub activation_code: String,

    #[serde(default)]
    pub activation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamRolesAnywhereSpec {
    #[serde(default)]
    pub node_name: String,

    #[serde(default)]
    pub trust_anchor_arn: String,

    #[serde(default)]
    pub profile_arn: String,

    #[serde(default)]
    pub role_arn: String,

    #[serde(default)]
    pub certificate_path: String,

    #[serde(default)]
    pub private_key_path: String,

    /// Where the rendered AWS config profile is written
    #[serde(default = "default_aws_config_path")]
    pub aws_config_path: String,
}

impl Default for IamRolesAnywhereSpec {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            trust_anchor_arn: String::new(),
            profile_arn: String::new(),
            role_arn: String::new(),
            certificate_path: String::new(),
            private_key_path: String::new(),
            aws_config_path: default_aws_config_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeletSpec {
    /// Merged over the generated kubelet configuration document
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub config: serde_json::Map<String, serde_json::Value>,

    /// Extra kubelet command line flags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

impl KubeletSpec {
    /// Value of `--node-ip`, accepting both `--node-ip=X` and `--node-ip X`.
    pub fn node_ip_flag(&self) -> Option<&str> {
        let mut iter = self.flags.iter();
        while let Some(flag) = iter.next() {
            if let Some(value) = flag.strip_prefix("--node-ip=") {
                return Some(value);
            }
            if flag == "--node-ip" {
                return iter.next().map(String::as_str);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerdSpec {
    /// TOML appended to the generated containerd configuration
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Check the MTU of the interface carrying the node IP
    #[serde(default = "default_true")]
    pub validate_mtu: bool,
}

impl Default for NetworkSpec {
    fn default() -> Self {
        Self {
            validate_mtu: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutSpec {
    /// Attempts at SSM registration before giving up
    #[serde(default = "default_registration_attempts")]
    pub registration_attempts: u32,

    #[serde(default = "default_registration_retry_delay")]
    pub registration_retry_delay_seconds: u64,

    /// How often to look for a daemon-produced credentials file
    #[serde(default = "default_credentials_poll_interval")]
    pub credentials_poll_interval_seconds: u64,

    #[serde(default = "default_credentials_timeout")]
    pub credentials_timeout_seconds: u64,
}

impl Default for TimeoutSpec {
    fn default() -> Self {
        Self {
            registration_attempts: default_registration_attempts(),
            registration_retry_delay_seconds: default_registration_retry_delay(),
            credentials_poll_interval_seconds: default_credentials_poll_interval(),
            credentials_timeout_seconds: default_credentials_timeout(),
        }
    }
}

impl TimeoutSpec {
    pub fn registration_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.registration_attempts,
            Duration::from_secs(self.registration_retry_delay_seconds),
        )
    }

    pub fn credentials_wait(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.credentials_poll_interval_seconds.max(1)),
            Duration::from_secs(self.credentials_timeout_seconds),
        )
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_aws_config_path() -> String {
    DEFAULT_AWS_CONFIG_PATH.to_string()
}

fn default_registration_attempts() -> u32 {
    5
}

fn default_registration_retry_delay() -> u64 {
    5
}

fn default_credentials_poll_interval() -> u64 {
    1
}

fn default_credentials_timeout() -> u64 {
    300
}

impl NodeConfig {
    /// Load configuration from a YAML (or JSON) file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. HYBRIDADM_CONFIG_PATH environment variable
    /// 2. ./nodeConfig.yaml (working directory)
    /// 3. /etc/hybridadm/nodeConfig.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HYBRIDADM_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./nodeConfig.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        let system_config = PathBuf::from("/etc/hybridadm/nodeConfig.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration from an explicit path or by discovery.
    ///
    /// Unlike most tools there is no usable default document: a node cannot
    /// join a cluster it knows nothing about, so a missing file is an error.
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match cli_path {
            Some(path) => {
                tracing::info!("Loading node configuration from explicit path: {:?}", path);
                path
            }
            None => {
                let path = Self::discover_config().ok_or(ConfigError::NotFound)?;
                tracing::info!("Loading node configuration from discovered path: {:?}", path);
                path
            }
        };
        let mut config = Self::from_yaml_file(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the timing knobs
    pub fn apply_env_overrides(&mut self) {
        let timeouts = &mut self.spec.timeouts;
        override_from_env(
            "HYBRIDADM_REGISTRATION_ATTEMPTS",
            &mut timeouts.registration_attempts,
        );
        override_from_env(
            "HYBRIDADM_REGISTRATION_RETRY_DELAY_SECONDS",
            &mut timeouts.registration_retry_delay_seconds,
        );
        override_from_env(
            "HYBRIDADM_CREDENTIALS_POLL_INTERVAL_SECONDS",
            &mut timeouts.credentials_poll_interval_seconds,
        );
        override_from_env(
            "HYBRIDADM_CREDENTIALS_TIMEOUT_SECONDS",
            &mut timeouts.credentials_timeout_seconds,
        );
    }

    /// Validate configuration. Runs before any side effect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::ApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(ConfigError::Kind(self.kind.clone()));
        }

        let cluster = &self.spec.cluster;
        if cluster.name.is_empty() {
            return Err(ConfigError::MissingField("spec.cluster.name"));
        }
        if cluster.region.is_empty() {
            return Err(ConfigError::MissingField("spec.cluster.region"));
        }
        if let Some(endpoint) = &cluster.api_server_endpoint {
            if !endpoint.starts_with("https://") {
                return Err(ConfigError::InvalidField {
                    field: "spec.cluster.apiServerEndpoint",
                    reason: format!("'{}' must be an https:// URL", endpoint),
                });
            }
        }
        cluster.certificate_authority_pem()?;
        if let Some(cidr) = &cluster.cidr {
            cidr.parse::<Ipv4Cidr>().map_err(|e| ConfigError::InvalidField {
                field: "spec.cluster.cidr",
                reason: e.to_string(),
            })?;
        }

        let hybrid = self
            .spec
            .hybrid
            .as_ref()
            .ok_or(ConfigError::NoCredentialStrategy)?;
        match (&hybrid.ssm, &hybrid.iam_roles_anywhere) {
            (Some(_), Some(_)) => return Err(ConfigError::MultipleCredentialStrategies),
            (None, None) => return Err(ConfigError::NoCredentialStrategy),
            (Some(ssm), None) => validate_ssm(ssm)?,
            (None, Some(iam)) => validate_iam_roles_anywhere(iam)?,
        }

        Ok(())
    }
}

fn validate_ssm(ssm: &SsmSpec) -> Result<(), ConfigError> {
    if ssm.activation_code.is_empty() {
        return Err(ConfigError::MissingField("spec.hybrid.ssm.activationCode"));
    }
    if ssm.activation_id.is_empty() {
        return Err(ConfigError::MissingField("spec.hybrid.ssm.activationId"));
    }
    Ok(())
}

/// Required IAM Roles Anywhere fields, in the order they are reported.
pub fn validate_iam_roles_anywhere(iam: &IamRolesAnywhereSpec) -> Result<(), ConfigError> {
    let required = [
        ("spec.hybrid.iamRolesAnywhere.nodeName", &iam.node_name),
        ("spec.hybrid.iamRolesAnywhere.trustAnchorArn", &iam.trust_anchor_arn),
        ("spec.hybrid.iamRolesAnywhere.profileArn", &iam.profile_arn),
        ("spec.hybrid.iamRolesAnywhere.roleArn", &iam.role_arn),
        ("spec.hybrid.iamRolesAnywhere.certificatePath", &iam.certificate_path),
        ("spec.hybrid.iamRolesAnywhere.privateKeyPath", &iam.private_key_path),
        ("spec.hybrid.iamRolesAnywhere.awsConfigPath", &iam.aws_config_path),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(ConfigError::MissingField(field));
        }
    }

    // The node name doubles as the IAM role session name.
    if iam.node_name.len() > MAX_NODE_NAME_LEN {
        return Err(ConfigError::InvalidField {
            field: "spec.hybrid.iamRolesAnywhere.nodeName",
            reason: format!("must be at most {} characters", MAX_NODE_NAME_LEN),
        });
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_+=,.@-".contains(c);
    if !iam.node_name.chars().all(allowed) {
        return Err(ConfigError::InvalidField {
            field: "spec.hybrid.iamRolesAnywhere.nodeName",
            reason: format!(
                "'{}' may only contain letters, digits and _+=,.@-",
                iam.node_name
            ),
        });
    }
    Ok(())
}

fn override_from_env<T: std::str::FromStr>(var: &str, target: &mut T) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => {
            tracing::info!("Environment override: {}={}", var, raw);
            *target = value;
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Ignoring.", var, raw);
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn iam_roles_anywhere_config() -> NodeConfig {
        NodeConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            spec: NodeConfigSpec {
                cluster: ClusterSpec {
                    name: "hybrid-cluster".to_string(),
                    region: "us-west-2".to_string(),
                    ..Default::default()
                },
                hybrid: Some(HybridSpec {
                    ssm: None,
                    iam_roles_anywhere: Some(IamRolesAnywhereSpec {
                        node_name: "n1".to_string(),
                        trust_anchor_arn: "arn:aws:rolesanywhere:us-west-2:123456789012:trust-anchor/ta".to_string(),
                        profile_arn: "arn:aws:rolesanywhere:us-west-2:123456789012:profile/p".to_string(),
                        role_arn: "arn:aws:iam::123456789012:role/hybrid-node".to_string(),
                        certificate_path: "/etc/iam/pki/server.pem".to_string(),
                        private_key_path: "/etc/iam/pki/server.key".to_string(),
                        aws_config_path: default_aws_config_path(),
                    }),
                    enable_credentials_file: false,
                }),
                kubelet: KubeletSpec::default(),
                containerd: ContainerdSpec::default(),
                network: NetworkSpec::default(),
                timeouts: TimeoutSpec::default(),
            },
        }
    }

    pub fn ssm_config() -> NodeConfig {
        let mut config = iam_roles_anywhere_config();
        config.spec.hybrid = Some(HybridSpec {
            ssm: Some(SsmSpec {
                activation_code: "code".to_string(),
                activation_id: "id".to_string(),
            }),
            iam_roles_anywhere: None,
            enable_credentials_file: false,
        });
        config
    }
}
