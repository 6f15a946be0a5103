// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use hybridadm_core::application::credentials::{configure_aws, CredentialDeps};
use hybridadm_core::domain::artifacts::ArtifactInstaller;
use hybridadm_core::domain::credentials::CredentialStrategy;
use hybridadm_core::domain::node_config::{NodeConfig, SsmSpec};
use hybridadm_core::domain::registration::{RegistrarError, SsmRegistrar};
use hybridadm_core::domain::service::{ServiceError, ServiceManager, UnitStatus};
use hybridadm_core::infrastructure::layout::HostLayout;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const IAM_RA_YAML: &str = r#"
apiVersion: node.eks.aws/v1alpha1
kind: NodeConfig
spec:
  cluster:
    name: hybrid-cluster
    region: eu-central-1
  hybrid:
    iamRolesAnywhere:
      nodeName: edge-node-01
      trustAnchorArn: arn:aws:rolesanywhere:eu-central-1:123456789012:trust-anchor/ta-1
      profileArn: arn:aws:rolesanywhere:eu-central-1:123456789012:profile/p-1
      roleArn: arn:aws:iam::123456789012:role/hybrid-node
      certificatePath: /etc/iam/pki/server.pem
      privateKeyPath: /etc/iam/pki/server.key
"#;

const SSM_YAML: &str = r#"
apiVersion: node.eks.aws/v1alpha1
kind: NodeConfig
spec:
  cluster:
    name: hybrid-cluster
    region: us-west-2
  hybrid:
    ssm:
      activationCode: code
      activationId: id
  timeouts:
    registrationRetryDelaySeconds: 0
    credentialsTimeoutSeconds: 5
"#;

#[derive(Default)]
struct NullServices {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ServiceManager for NullServices {
    async fn reload(&self) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push("daemon-reload".to_string());
        Ok(())
    }
    async fn enable(&self, unit: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(format!("enable {}", unit));
        Ok(())
    }
    async fn disable(&self, unit: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(format!("disable {}", unit));
        Ok(())
    }
    async fn start(&self, unit: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(format!("start {}", unit));
        Ok(())
    }
    async fn restart(&self, unit: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(format!("restart {}", unit));
        Ok(())
    }
    async fn stop(&self, unit: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(format!("stop {}", unit));
        Ok(())
    }
    async fn status(&self, _unit: &str) -> Result<UnitStatus, ServiceError> {
        Ok(UnitStatus::NotLoaded)
    }
}

/// Fails with each scripted output in turn, then succeeds and writes the record.
struct ScriptedRegistrar {
    failures: Mutex<Vec<&'static str>>,
    record: PathBuf,
    calls: Mutex<u32>,
}

impl ScriptedRegistrar {
    fn new(record: PathBuf, failures: Vec<&'static str>) -> Self {
        Self {
            failures: Mutex::new(failures),
            record,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl SsmRegistrar for ScriptedRegistrar {
    async fn register(&self, _activation: &SsmSpec, region: &str) -> Result<(), RegistrarError> {
        *self.calls.lock().unwrap() += 1;
        let mut failures = self.failures.lock().unwrap();
        if !failures.is_empty() {
            return Err(RegistrarError {
                output: failures.remove(0).to_string(),
            });
        }
        std::fs::create_dir_all(self.record.parent().unwrap()).unwrap();
        std::fs::write(
            &self.record,
            format!(r#"{{"ManagedInstanceID":"mi-0a1b2c3d4e5f60718","Region":"{}"}}"#, region),
        )
        .unwrap();
        Ok(())
    }
}

#[derive(Default)]
struct CountingInstaller {
    reinstalls: Mutex<u32>,
}

#[async_trait]
impl ArtifactInstaller for CountingInstaller {
    async fn reinstall_ssm_setup(&self, _region: &str) -> anyhow::Result<()> {
        *self.reinstalls.lock().unwrap() += 1;
        Ok(())
    }
    async fn upgrade(&self, _target_version: &semver::Version) -> anyhow::Result<()> {
        Ok(())
    }
}

fn touch(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn deps(
    layout: &HostLayout,
    services: Arc<NullServices>,
    registrar: Arc<ScriptedRegistrar>,
    installer: Arc<CountingInstaller>,
) -> CredentialDeps {
    CredentialDeps {
        layout: layout.clone(),
        services,
        registrar,
        installer,
    }
}

// ── IAM Roles Anywhere ──

#[tokio::test]
async fn test_iam_roles_anywhere_profile_is_byte_exact() {
    let dir = tempfile::tempdir().unwrap();
    let layout = HostLayout::new(dir.path());
    touch(&layout.path("/etc/iam/pki/server.pem"), "cert");
    touch(&layout.path("/etc/iam/pki/server.key"), "key");
    let services = Arc::new(NullServices::default());
    let registrar = Arc::new(ScriptedRegistrar::new(layout.registration(), vec![]));
    let config = NodeConfig::from_yaml_str(IAM_RA_YAML).unwrap();

    let session = configure_aws(
        &config,
        &deps(&layout, services.clone(), registrar.clone(), Arc::default()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let expected = "[profile hybrid]\n\
region = eu-central-1\n\
credential_process = /usr/local/bin/aws_signing_helper credential-process \
--certificate /etc/iam/pki/server.pem \
--private-key /etc/iam/pki/server.key \
--profile-arn arn:aws:rolesanywhere:eu-central-1:123456789012:profile/p-1 \
--role-arn arn:aws:iam::123456789012:role/hybrid-node \
--trust-anchor-arn arn:aws:rolesanywhere:eu-central-1:123456789012:trust-anchor/ta-1 \
--role-session-name edge-node-01\n";
    let written = std::fs::read_to_string(layout.path("/etc/aws/hybrid/config")).unwrap();
    assert_eq!(written, expected);

    assert_eq!(session.node_name, "edge-node-01");
    assert_eq!(session.strategy, CredentialStrategy::IamRolesAnywhere);
    assert_eq!(
        session.sdk_config.region().map(|r| r.as_ref()),
        Some("eu-central-1")
    );
    assert_eq!(*registrar.calls.lock().unwrap(), 0);
    assert!(services.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_iam_roles_anywhere_configure_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let layout = HostLayout::new(dir.path());
    touch(&layout.path("/etc/iam/pki/server.pem"), "cert");
    touch(&layout.path("/etc/iam/pki/server.key"), "key");
    let config = NodeConfig::from_yaml_str(IAM_RA_YAML).unwrap();
    let deps = deps(
        &layout,
        Arc::default(),
        Arc::new(ScriptedRegistrar::new(layout.registration(), vec![])),
        Arc::default(),
    );
    let profile = layout.path("/etc/aws/hybrid/config");

    configure_aws(&config, &deps, &CancellationToken::new()).await.unwrap();
    let first = std::fs::read(&profile).unwrap();
    let first_modified = std::fs::metadata(&profile).unwrap().modified().unwrap();
    configure_aws(&config, &deps, &CancellationToken::new()).await.unwrap();

    assert_eq!(std::fs::read(&profile).unwrap(), first);
    assert_eq!(std::fs::metadata(&profile).unwrap().modified().unwrap(), first_modified);
}

#[tokio::test]
async fn test_iam_roles_anywhere_missing_key_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let layout = HostLayout::new(dir.path());
    touch(&layout.path("/etc/iam/pki/server.pem"), "cert");
    let config = NodeConfig::from_yaml_str(IAM_RA_YAML).unwrap();

    let err = configure_aws(
        &config,
        &deps(
            &layout,
            Arc::default(),
            Arc::new(ScriptedRegistrar::new(layout.registration(), vec![])),
            Arc::default(),
        ),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("privateKeyPath"));
    assert!(!layout.path("/etc/aws/hybrid/config").exists());
}

// ── SSM ──

#[tokio::test]
async fn test_ssm_checksum_mismatch_reinstalls_and_retries_once() {
    let dir = tempfile::tempdir().unwrap();
    let layout = HostLayout::new(dir.path());
    touch(&layout.ssm_credentials(), "[default]\n");
    let registrar = Arc::new(ScriptedRegistrar::new(
        layout.registration(),
        vec!["Error: checksum mismatch for amazon-ssm-agent.rpm"],
    ));
    let installer = Arc::new(CountingInstaller::default());
    let config = NodeConfig::from_yaml_str(SSM_YAML).unwrap();

    let session = configure_aws(
        &config,
        &deps(&layout, Arc::default(), registrar.clone(), installer.clone()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(*registrar.calls.lock().unwrap(), 2);
    assert_eq!(*installer.reinstalls.lock().unwrap(), 1);
    assert_eq!(session.node_name, "mi-0a1b2c3d4e5f60718");
    assert_eq!(session.strategy, CredentialStrategy::Ssm);
}

#[tokio::test]
async fn test_ssm_second_checksum_mismatch_is_not_retried_again() {
    let dir = tempfile::tempdir().unwrap();
    let layout = HostLayout::new(dir.path());
    let registrar = Arc::new(ScriptedRegistrar::new(
        layout.registration(),
        vec!["checksum mismatch", "checksum mismatch", "checksum mismatch"],
    ));
    let installer = Arc::new(CountingInstaller::default());
    let config = NodeConfig::from_yaml_str(SSM_YAML).unwrap();

    let result = configure_aws(
        &config,
        &deps(&layout, Arc::default(), registrar.clone(), installer.clone()),
        &CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(*registrar.calls.lock().unwrap(), 2);
    assert_eq!(*installer.reinstalls.lock().unwrap(), 1);
    assert!(!layout.registration().exists());
}
