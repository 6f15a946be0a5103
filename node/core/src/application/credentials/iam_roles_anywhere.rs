// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! IAM Roles Anywhere
//!
//! Writes a `[profile hybrid]` whose `credential_process` is the signing
//! helper, so every SDK call exchanges the node certificate for role
//! credentials on demand.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::daemon_manager::DaemonManager;
use crate::domain::credentials::CredentialStrategy;
use crate::domain::daemon::Daemon;
use crate::domain::node_config::{validate_iam_roles_anywhere, IamRolesAnywhereSpec, NodeConfig};
use crate::infrastructure::aws::{load_profile_config, ProfileSource};
use crate::infrastructure::daemons::kubelet::AWS_PROFILE_NAME;
use crate::infrastructure::daemons::signing_helper::SIGNING_HELPER_PATH;
use crate::infrastructure::daemons::SigningHelperDaemon;
use crate::infrastructure::fs::write_if_changed;
use crate::infrastructure::layout::HostLayout;
use crate::infrastructure::templates::{TemplateEngine, AWS_CONFIG_TEMPLATE};

use super::{AwsSession, CredentialDeps, CredentialsError};

#[derive(Serialize)]
struct ProfileContext<'a> {
    region: &'a str,
    signing_helper: &'a str,
    certificate_path: &'a str,
    private_key_path: &'a str,
    profile_arn: &'a str,
    role_arn: &'a str,
    trust_anchor_arn: &'a str,
    node_name: &'a str,
}

/// The AWS config file contents for `spec`, pinned to the cluster region.
pub fn render_profile(spec: &IamRolesAnywhereSpec, region: &str) -> Result<String, CredentialsError> {
    let context = ProfileContext {
        region,
        signing_helper: SIGNING_HELPER_PATH,
        certificate_path: &spec.certificate_path,
        private_key_path: &spec.private_key_path,
        profile_arn: &spec.profile_arn,
        role_arn: &spec.role_arn,
        trust_anchor_arn: &spec.trust_anchor_arn,
        node_name: &spec.node_name,
    };
    TemplateEngine::new()
        .render(AWS_CONFIG_TEMPLATE, &context)
        .map_err(|e| CredentialsError::Render(e.to_string()))
}

pub(super) fn signing_helper_daemon(
    config: &NodeConfig,
    spec: &IamRolesAnywhereSpec,
    deps: &CredentialDeps,
) -> Arc<dyn Daemon> {
    Arc::new(SigningHelperDaemon::new(
        deps.layout.clone(),
        deps.services.clone(),
        spec.clone(),
        config.spec.cluster.region.clone(),
        config.spec.timeouts.credentials_wait(),
    ))
}

fn require_file(layout: &HostLayout, field: &'static str, host_path: &str) -> Result<(), CredentialsError> {
    let path = layout.path(host_path);
    if path.is_file() {
        Ok(())
    } else {
        Err(CredentialsError::MissingFile { field, path })
    }
}

pub(super) async fn configure(
    config: &NodeConfig,
    spec: &IamRolesAnywhereSpec,
    deps: &CredentialDeps,
    cancel: &CancellationToken,
) -> Result<AwsSession, CredentialsError> {
    validate_iam_roles_anywhere(spec)?;
    require_file(&deps.layout, "certificatePath", &spec.certificate_path)?;
    require_file(&deps.layout, "privateKeyPath", &spec.private_key_path)?;

    let region = &config.spec.cluster.region;
    let profile = render_profile(spec, region)?;
    let profile_path = deps.layout.path(&spec.aws_config_path);
    let changed = write_if_changed(&profile_path, profile.as_bytes(), Some(0o644))
        .await
        .map_err(|source| CredentialsError::WriteProfile {
            path: profile_path.clone(),
            source,
        })?;
    info!(path = %profile_path.display(), changed, "AWS config profile written");

    if config.credentials_file_enabled() {
        DaemonManager::new(cancel.clone())
            .bring_up(&[signing_helper_daemon(config, spec, deps)])
            .await?;
    }

    Ok(session(config, spec, &deps.layout).await)
}

pub(super) async fn load_existing(
    config: &NodeConfig,
    spec: &IamRolesAnywhereSpec,
    layout: &HostLayout,
) -> Result<AwsSession, CredentialsError> {
    let profile_path = layout.path(&spec.aws_config_path);
    if !profile_path.is_file() {
        return Err(CredentialsError::NotProvisioned {
            strategy: CredentialStrategy::IamRolesAnywhere,
            path: profile_path,
        });
    }
    Ok(session(config, spec, layout).await)
}

async fn session(config: &NodeConfig, spec: &IamRolesAnywhereSpec, layout: &HostLayout) -> AwsSession {
    let profile_path = layout.path(&spec.aws_config_path);
    let credentials = layout.signing_helper_credentials();
    let credentials_file: Option<&Path> = config
        .credentials_file_enabled()
        .then_some(credentials.as_path());
    let sdk_config = load_profile_config(&ProfileSource {
        region: &config.spec.cluster.region,
        profile: AWS_PROFILE_NAME,
        config_file: Some(&profile_path),
        credentials_file,
    })
    .await;
    AwsSession {
        sdk_config,
        node_name: spec.node_name.clone(),
        strategy: CredentialStrategy::IamRolesAnywhere,
    }
}
